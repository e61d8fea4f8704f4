//! JNI entry points declared by the Java `MyLib` classes.

use crate::{bridge::guard, config::Config, fault};
use jni::{
    objects::JClass,
    sys::{jint, JNI_ERR},
    JNIEnv, JavaVM,
};
use std::ffi::c_void;

/// Tag used by the `launcher.uvdemo.myapplication` activity.
pub const MYAPPLICATION_TAG: &str = "launcher.uvdemo.myapplication";

#[no_mangle]
pub extern "C" fn JNI_OnLoad(vm: JavaVM, _res: *const c_void) -> jint {
    let env = match vm.get_env() {
        Ok(env) => env,
        Err(_) => return JNI_ERR,
    };
    if crate::init(&env, Config::default()).is_err() {
        return JNI_ERR;
    }
    log::debug!(target: crate::config::current().tag(), "mylib loaded");
    jni::JNIVersion::V6.into()
}

/// `launcher.uvdemo.app.MyLib.boom()`
#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLib_boom(env: JNIEnv, _class: JClass) {
    guard(&env, "boom", || fault::boom());
}

/// `launcher.uvdemo.app.MyLib.throwException()`
#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLib_throwException(env: JNIEnv, _class: JClass) {
    guard(&env, "throwException", || fault::throw_exception(&env));
}

/// `launcher.uvdemo.myapplication.MyLib.initialize()`
#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_myapplication_MyLib_initialize(
    env: JNIEnv,
    _class: JClass,
) {
    guard(&env, "initialize", || {
        crate::init(&env, Config::default())?;
        log::info!(target: MYAPPLICATION_TAG, "Welcome to MyLib!");
        Ok(())
    });
}
