// JNI exports for com.android.xo.XoLib
//
// Every export forwards to the process-wide SessionHost. Void calls raise
// IllegalStateException on failure; render() returns the status code.

use std::path::PathBuf;

use jni::objects::{JClass, JFloatArray, JString};
use jni::sys::{jfloat, jint};
use jni::JNIEnv;
use log::warn;
use once_cell::sync::Lazy;

use crate::error::{ErrorCode, SessionError};
use crate::host::{platform_scale, SessionHost};

static HOST: Lazy<SessionHost> = Lazy::new(SessionHost::new);

const EXCEPTION_CLASS: &str = "java/lang/IllegalStateException";

fn throw_on_error(env: &mut JNIEnv, result: Result<(), SessionError>) {
    if let Err(err) = result {
        let message = format!("xo error {}: {}", err.code(), err.message());
        if let Err(throw_err) = env.throw_new(EXCEPTION_CLASS, message) {
            warn!("[JNI] Failed to raise exception: {}", throw_err);
        }
    }
}

fn read_floats(env: &mut JNIEnv, array: &JFloatArray) -> jni::errors::Result<Vec<f32>> {
    if array.is_null() {
        return Ok(Vec::new());
    }
    let len = env.get_array_length(array)?;
    let mut values = vec![0.0f32; len.max(0) as usize];
    env.get_float_array_region(array, 0, &mut values)?;
    Ok(values)
}

#[no_mangle]
pub extern "system" fn Java_com_android_xo_XoLib_initXo(
    mut env: JNIEnv,
    _class: JClass,
    cache_dir: JString,
    scaled_density: jfloat,
) {
    let cache_dir = if cache_dir.is_null() {
        None
    } else {
        match env.get_string(&cache_dir) {
            Ok(dir) => Some(PathBuf::from(String::from(dir))),
            Err(err) => {
                warn!("[JNI] Unreadable cache directory: {}", err);
                None
            }
        }
    };
    let result = HOST.configure(cache_dir, scaled_density);
    throw_on_error(&mut env, result);
}

#[no_mangle]
pub extern "system" fn Java_com_android_xo_XoLib_initSurface(
    mut env: JNIEnv,
    _class: JClass,
    width: jint,
    height: jint,
    scale: jfloat,
) {
    let result = HOST.initialize(width, height, platform_scale(scale), None);
    throw_on_error(&mut env, result);
}

#[no_mangle]
pub extern "system" fn Java_com_android_xo_XoLib_surfacelost(mut env: JNIEnv, _class: JClass) {
    let result = HOST.notify_surface_lost();
    throw_on_error(&mut env, result);
}

#[no_mangle]
pub extern "system" fn Java_com_android_xo_XoLib_destroy(
    mut env: JNIEnv,
    _class: JClass,
    is_killing: jint,
) {
    let result = HOST.teardown(is_killing);
    throw_on_error(&mut env, result);
}

/// `0` rendered, `1` nothing to render, negated error code on failure
#[no_mangle]
pub extern "system" fn Java_com_android_xo_XoLib_render(_env: JNIEnv, _class: JClass) -> jint {
    HOST.step_code()
}

#[no_mangle]
pub extern "system" fn Java_com_android_xo_XoLib_input(
    mut env: JNIEnv,
    _class: JClass,
    kind: jint,
    xs: JFloatArray,
    ys: JFloatArray,
) {
    let (xs, ys) = match (read_floats(&mut env, &xs), read_floats(&mut env, &ys)) {
        (Ok(xs), Ok(ys)) => (xs, ys),
        (Err(err), _) | (_, Err(err)) => {
            warn!("[JNI] Dropping input event: {}", err);
            return;
        }
    };
    let result = HOST.submit_input(kind, &xs, &ys);
    throw_on_error(&mut env, result);
}
