// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI entry points on `com.visha.airesume.iap.NativeBridgeHost`.
//
// The host activity calls `nativeInit` once from `configureFlutterEngine`,
// then forwards every method-channel call to `nativeHandleMethodCall` and
// returns the decoded reply to Dart.

use std::sync::OnceLock;

use jni::JNIEnv;
use jni::objects::{JClass, JObject, JString};
use jni::sys::{JNI_FALSE, JNI_TRUE, jboolean, jint, jstring};

use iapbridge_core::BridgeConfig;
use iapbridge_core::error::{BridgeError, Result};

use crate::BridgeServices;

static SERVICES: OnceLock<BridgeServices> = OnceLock::new();

fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Result<String> {
    if value.is_null() {
        return Ok(String::new());
    }
    env.get_string(value)
        .map(String::from)
        .map_err(|e| BridgeError::Bridge(format!("get_string: {e}")))
}

fn init(env: &mut JNIEnv<'_>, context: &JObject<'_>, config_json: &JString<'_>) -> Result<()> {
    if SERVICES.get().is_some() {
        return Ok(());
    }
    iapbridge_platform::android::attach(env, context)?;

    let json = read_string(env, config_json)?;
    let config = if json.trim().is_empty() {
        BridgeConfig::default()
    } else {
        BridgeConfig::from_json(&json)?
    };

    let services = BridgeServices::init(config)?;
    let _ = SERVICES.set(services);
    Ok(())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativeBridgeHost_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    context: JObject,
    config_json: JString,
) -> jboolean {
    match init(&mut env, &context, &config_json) {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            tracing::error!(error = %e, "Android: bridge init failed");
            JNI_FALSE
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativeBridgeHost_nativeHandleMethodCall(
    mut env: JNIEnv,
    _class: JClass,
    method: JString,
    arguments_json: JString,
) -> jstring {
    let reply = match (
        SERVICES.get(),
        read_string(&mut env, &method),
        read_string(&mut env, &arguments_json),
    ) {
        (Some(services), Ok(method), Ok(arguments)) => services.handle_json(&method, &arguments),
        (None, ..) => iapbridge_billing::MethodResponse::from(BridgeError::NotInitialized).to_json(),
        (_, Err(e), _) | (_, _, Err(e)) => iapbridge_billing::MethodResponse::from(e).to_json(),
    };

    match env.new_string(reply) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            tracing::error!(error = %e, "Android: could not allocate reply string");
            std::ptr::null_mut()
        }
    }
}

/// Host-driven liveness sweep; the bridge spawns no timer of its own.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativeBridgeHost_nativeExpireStale(
    _env: JNIEnv,
    _class: JClass,
) -> jint {
    SERVICES
        .get()
        .map(|services| jint::try_from(services.expire_stale()).unwrap_or(jint::MAX))
        .unwrap_or(0)
}
