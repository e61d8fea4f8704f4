use jni::{
    objects::{JClass, JObject, JString, JThrowable},
    JNIEnv,
};
use jni_utils::exceptions::{throw_unwind, try_block};
use mylib::{
    bridge::{guard, ERROR_CLASS},
    exports::{
        Java_launcher_uvdemo_app_MyLib_throwException,
        Java_launcher_uvdemo_myapplication_MyLib_initialize,
    },
    fault::THROW_MESSAGE,
    Error,
};
use std::sync::Once;

// JNI_OnLoad comes from mylib itself.

fn setup(env: &JNIEnv) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        jni_utils::init(env).unwrap();
    });
}

fn message<'a: 'b, 'b>(env: &'b JNIEnv<'a>, ex: JThrowable<'a>) -> jni::errors::Result<String> {
    let msg = env
        .call_method(ex, "getMessage", "()Ljava/lang/String;", &[])?
        .l()?;
    Ok(env.get_string(JString::from(msg))?.into())
}

/// Runs `f` and returns the message of the `java.lang.Error` it left
/// pending, or `None` if nothing was thrown.
fn caught_error<'a: 'b, 'b>(env: &'b JNIEnv<'a>, f: impl FnOnce()) -> Option<String> {
    try_block(env, || {
        f();
        if env.exception_check()? {
            return Err(jni::errors::Error::JavaException);
        }
        Ok(None)
    })
    .catch(ERROR_CLASS, |ex| Ok(Some(message(env, ex)?)))
    .result()
    .unwrap()
}

fn null_class<'a>() -> JClass<'a> {
    JClass::from(JObject::null())
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLibTest_testThrowExceptionMessage(
    env: JNIEnv,
    _obj: JObject,
) {
    let _ = throw_unwind(&env, || {
        setup(&env);

        let msg = caught_error(&env, || {
            Java_launcher_uvdemo_app_MyLib_throwException(env.clone(), null_class());
        });
        assert_eq!(msg.as_deref(), Some(THROW_MESSAGE));
        assert!(!env.exception_check().unwrap());
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLibTest_testThrowExceptionRepeatedly(
    env: JNIEnv,
    _obj: JObject,
) {
    let _ = throw_unwind(&env, || {
        setup(&env);

        for _ in 0..3 {
            let msg = caught_error(&env, || {
                Java_launcher_uvdemo_app_MyLib_throwException(env.clone(), null_class());
            });
            assert_eq!(msg.as_deref(), Some(THROW_MESSAGE));
        }
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLibTest_testThrowExceptionIsAnError(
    env: JNIEnv,
    _obj: JObject,
) {
    let _ = throw_unwind(&env, || {
        setup(&env);

        Java_launcher_uvdemo_app_MyLib_throwException(env.clone(), null_class());
        assert!(env.exception_check().unwrap());
        let ex = env.exception_occurred().unwrap();
        env.exception_clear().unwrap();

        assert!(env.is_instance_of(ex, "java/lang/Error").unwrap());
        assert!(!env.is_instance_of(ex, "java/lang/Exception").unwrap());
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_myapplication_MyLibTest_testInitialize(
    env: JNIEnv,
    _obj: JObject,
) {
    let _ = throw_unwind(&env, || {
        setup(&env);

        let msg = caught_error(&env, || {
            Java_launcher_uvdemo_myapplication_MyLib_initialize(env.clone(), null_class());
            Java_launcher_uvdemo_myapplication_MyLib_initialize(env.clone(), null_class());
            log::info!("logging after initialize()");
        });
        assert_eq!(msg, None);
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLibTest_testGuardPanic(env: JNIEnv, _obj: JObject) {
    let _ = throw_unwind(&env, || {
        setup(&env);

        let msg = caught_error(&env, || {
            guard(&env, "testGuardPanic", || panic!("guarded panic"));
        });
        assert_eq!(msg.as_deref(), Some("guarded panic"));
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLibTest_testGuardError(env: JNIEnv, _obj: JObject) {
    let _ = throw_unwind(&env, || {
        setup(&env);

        let msg = caught_error(&env, || {
            guard(&env, "testGuardError", || {
                Err(Error::Panic("guarded error".to_string()))
            });
        });
        assert_eq!(msg.as_deref(), Some("native panic: guarded error"));
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLibTest_testGuardKeepsPendingException(
    env: JNIEnv,
    _obj: JObject,
) {
    let _ = throw_unwind(&env, || {
        setup(&env);

        guard(&env, "testGuardKeepsPendingException", || {
            env.find_class("launcher/uvdemo/app/DoesNotExist")?;
            Ok(())
        });

        let result = try_block(&env, || {
            if env.exception_check()? {
                return Err(jni::errors::Error::JavaException);
            }
            Ok(false)
        })
        .catch("java/lang/NoClassDefFoundError", |_ex| Ok(true))
        .result();
        assert_eq!(result.unwrap(), true);
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_app_MyLibTest_testLoggingKeepsSamePendingException(
    env: JNIEnv,
    _obj: JObject,
) {
    let _ = throw_unwind(&env, || {
        setup(&env);
        Java_launcher_uvdemo_myapplication_MyLib_initialize(env.clone(), null_class());

        let msg = env.new_string("pending while logging").unwrap();
        let thrown = env
            .new_object(
                "java/lang/IllegalStateException",
                "(Ljava/lang/String;)V",
                &[msg.into()],
            )
            .unwrap();
        env.throw(JThrowable::from(thrown)).unwrap();

        log::error!(target: "MyLibTest", "logging with an exception pending");
        log::info!(target: "launcher.uvdemo.myapplication", "long tag, same exception");

        assert!(env.exception_check().unwrap());
        let pending = env.exception_occurred().unwrap();
        env.exception_clear().unwrap();
        assert!(env.is_same_object(pending, thrown).unwrap());
    });
}

#[no_mangle]
pub extern "C" fn Java_launcher_uvdemo_myapplication_MyLibTest_testLongTagLogs(
    env: JNIEnv,
    _obj: JObject,
) {
    let _ = throw_unwind(&env, || {
        setup(&env);
        Java_launcher_uvdemo_myapplication_MyLib_initialize(env.clone(), null_class());

        assert!(log::log_enabled!(
            target: "launcher.uvdemo.myapplication",
            log::Level::Info
        ));
        log::info!(target: "launcher.uvdemo.myapplication", "a tag longer than 23 chars");
        assert!(!env.exception_check().unwrap());
    });
}
