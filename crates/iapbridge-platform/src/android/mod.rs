// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform capabilities via JNI.
//
// ## Architecture notes
//
// Requests go straight to `com.amazon.device.iap.PurchasingService` through
// static JNI calls. Responses cannot be received by Rust directly: the SDK
// wants a Java `PurchasingListener`. The host app therefore ships two small
// Java shims:
//
// - `NativePurchasingListener` implements `PurchasingListener`, serialises
//   each response to JSON (field names as in `iapbridge_core::vendor`) and
//   calls the matching `nativeOn*` export below.
// - `NativeBridgeHost` exposes `invokeMethod(method, json)` on the Flutter
//   method channel and `requestMainThreadDrain()`, which posts a Runnable to
//   the main looper that calls back into `nativeDrainMainThread`.
//
// The export functions need a process-wide listener slot because the JVM
// resolves them by symbol name. The bridge itself never reads that slot; it
// only sees the `BillingService` trait.

#![cfg(target_os = "android")]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::{JNIEnv, JavaVM};
use serde::de::DeserializeOwned;

use iapbridge_core::error::{BridgeError, Result};
use iapbridge_core::types::RequestHandle;
use iapbridge_core::vendor::{
    ProductDataResponse, PurchaseResponse, PurchaseUpdatesResponse, UserDataResponse,
};

use crate::executor::{MainThreadQueue, QueuedExecutor, main_thread_channel};
use crate::traits::*;

// ---------------------------------------------------------------------------
// Class names and signatures
// ---------------------------------------------------------------------------

const PURCHASING_SERVICE: &str = "com/amazon/device/iap/PurchasingService";
const LISTENER_SHIM: &str = "com/visha/airesume/iap/NativePurchasingListener";
const HOST_SHIM: &str = "com/visha/airesume/iap/NativeBridgeHost";

const SIG_REGISTER_LISTENER: &str =
    "(Landroid/content/Context;Lcom/amazon/device/iap/PurchasingListener;)V";
const SIG_GET_PRODUCT_DATA: &str = "(Ljava/util/Set;)Lcom/amazon/device/iap/model/RequestId;";
const SIG_PURCHASE: &str = "(Ljava/lang/String;)Lcom/amazon/device/iap/model/RequestId;";
const SIG_GET_PURCHASE_UPDATES: &str = "(Z)Lcom/amazon/device/iap/model/RequestId;";
const SIG_GET_USER_DATA: &str = "()Lcom/amazon/device/iap/model/RequestId;";

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();
static APP_CONTEXT: OnceLock<GlobalRef> = OnceLock::new();

/// Listener the `nativeOn*` exports deliver to.
static LISTENER: RwLock<Option<Arc<dyn BillingListener>>> = RwLock::new(None);

/// Tasks waiting for the main looper to call `nativeDrainMainThread`.
static MAIN_THREAD: OnceLock<(QueuedExecutor, Mutex<MainThreadQueue>)> = OnceLock::new();

/// Convenience: map any `jni::errors::Error` into `BridgeError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> BridgeError {
    BridgeError::Bridge(format!("{context}: {e}"))
}

/// Record the JVM and application context handed to us by the host.
///
/// Must run once, from the JNI thread that calls the app's init export,
/// before any other function in this module. Later calls are ignored.
pub fn attach(env: &mut JNIEnv<'_>, context: &JObject<'_>) -> Result<()> {
    if APP_CONTEXT.get().is_some() {
        return Ok(());
    }

    let vm = env.get_java_vm().map_err(|e| jni_err("get_java_vm", e))?;
    let global = env
        .new_global_ref(context)
        .map_err(|e| jni_err("new_global_ref(context)", e))?;

    // Publish the context for other NDK-aware libraries in the process.
    // SAFETY: both pointers stay valid for the life of the process: the VM
    // is never destroyed, and the global ref is parked in a static below.
    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            global.as_obj().as_raw().cast(),
        );
    }

    let _ = JAVA_VM.set(vm);
    let _ = APP_CONTEXT.set(global);
    tracing::info!("Android: JNI context attached");
    Ok(())
}

/// Obtain a [`JNIEnv`] for the current thread, attaching it if needed.
fn jni_env() -> Result<JNIEnv<'static>> {
    let vm = JAVA_VM
        .get()
        .ok_or_else(|| BridgeError::Bridge("JNI not attached; call attach() first".into()))?;
    vm.attach_current_thread_permanently()
        .map_err(|e| jni_err("attach_current_thread", e))
}

/// The application `Context` recorded by [`attach`].
fn app_context() -> Result<&'static JObject<'static>> {
    APP_CONTEXT
        .get()
        .map(|global| global.as_obj())
        .ok_or_else(|| BridgeError::Bridge("Android context is unset; call attach() first".into()))
}

/// Convert a returned `RequestId` object into a [`RequestHandle`].
fn request_handle(env: &mut JNIEnv<'_>, request_id: JObject<'_>) -> Result<RequestHandle> {
    if request_id.is_null() {
        return Err(BridgeError::Vendor("vendor returned a null RequestId".into()));
    }
    let text: JObject = env
        .call_method(&request_id, "toString", "()Ljava/lang/String;", &[])
        .map_err(|e| jni_err("RequestId.toString", e))?
        .l()
        .map_err(|e| jni_err("toString->l", e))?;

    let id: String = env
        .get_string(&JString::from(text))
        .map_err(|e| jni_err("get_string(requestId)", e))?
        .into();
    Ok(RequestHandle::new(id))
}

// ---------------------------------------------------------------------------
// BillingService: com.amazon.device.iap.PurchasingService
// ---------------------------------------------------------------------------

/// Amazon Appstore billing through JNI.
///
/// Zero-sized: the SDK keeps its own state on the Java side.
pub struct AndroidBillingService;

impl AndroidBillingService {
    /// This does **not** touch JNI; the first call happens on
    /// `register_listener`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBillingService {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingService for AndroidBillingService {
    fn register_listener(&self, listener: Arc<dyn BillingListener>) -> Result<()> {
        let mut env = jni_env()?;
        let context = app_context()?;

        *LISTENER
            .write()
            .map_err(|_| BridgeError::Bridge("listener slot poisoned".into()))? = Some(listener);

        let shim: JObject = env
            .new_object(LISTENER_SHIM, "()V", &[])
            .map_err(|e| jni_err("new NativePurchasingListener", e))?;

        env.call_static_method(
            PURCHASING_SERVICE,
            "registerListener",
            SIG_REGISTER_LISTENER,
            &[JValue::Object(context), JValue::Object(&shim)],
        )
        .map_err(|e| jni_err("PurchasingService.registerListener", e))?;

        tracing::info!("Android: Appstore purchasing listener registered");
        Ok(())
    }

    fn get_product_data(&self, skus: &BTreeSet<String>) -> Result<RequestHandle> {
        let mut env = jni_env()?;

        let set: JObject = env
            .new_object("java/util/HashSet", "()V", &[])
            .map_err(|e| jni_err("new HashSet", e))?;
        for sku in skus {
            let j_sku: JString = env
                .new_string(sku)
                .map_err(|e| jni_err("new_string(sku)", e))?;
            env.call_method(&set, "add", "(Ljava/lang/Object;)Z", &[JValue::Object(&j_sku)])
                .map_err(|e| jni_err("HashSet.add", e))?;
        }

        let request_id = env
            .call_static_method(
                PURCHASING_SERVICE,
                "getProductData",
                SIG_GET_PRODUCT_DATA,
                &[JValue::Object(&set)],
            )
            .map_err(|e| jni_err("PurchasingService.getProductData", e))?
            .l()
            .map_err(|e| jni_err("getProductData->l", e))?;

        request_handle(&mut env, request_id)
    }

    fn purchase(&self, sku: &str) -> Result<RequestHandle> {
        let mut env = jni_env()?;
        let j_sku: JString = env
            .new_string(sku)
            .map_err(|e| jni_err("new_string(sku)", e))?;

        let request_id = env
            .call_static_method(
                PURCHASING_SERVICE,
                "purchase",
                SIG_PURCHASE,
                &[JValue::Object(&j_sku)],
            )
            .map_err(|e| jni_err("PurchasingService.purchase", e))?
            .l()
            .map_err(|e| jni_err("purchase->l", e))?;

        request_handle(&mut env, request_id)
    }

    fn get_purchase_updates(&self, reset: bool) -> Result<RequestHandle> {
        let mut env = jni_env()?;
        let request_id = env
            .call_static_method(
                PURCHASING_SERVICE,
                "getPurchaseUpdates",
                SIG_GET_PURCHASE_UPDATES,
                &[JValue::Bool(u8::from(reset))],
            )
            .map_err(|e| jni_err("PurchasingService.getPurchaseUpdates", e))?
            .l()
            .map_err(|e| jni_err("getPurchaseUpdates->l", e))?;

        request_handle(&mut env, request_id)
    }

    fn get_user_data(&self) -> Result<RequestHandle> {
        let mut env = jni_env()?;
        let request_id = env
            .call_static_method(PURCHASING_SERVICE, "getUserData", SIG_GET_USER_DATA, &[])
            .map_err(|e| jni_err("PurchasingService.getUserData", e))?
            .l()
            .map_err(|e| jni_err("getUserData->l", e))?;

        request_handle(&mut env, request_id)
    }
}

// ---------------------------------------------------------------------------
// HostChannel: NativeBridgeHost.invokeMethod
// ---------------------------------------------------------------------------

/// Flutter method channel reached through the `NativeBridgeHost` shim.
pub struct AndroidHostChannel {
    channel_name: String,
}

impl AndroidHostChannel {
    pub fn new(channel_name: &str) -> Self {
        Self {
            channel_name: channel_name.to_owned(),
        }
    }
}

impl HostChannel for AndroidHostChannel {
    fn invoke_method(&self, method: &str, arguments: serde_json::Value) -> Result<()> {
        let mut env = jni_env()?;
        let j_channel: JString = env
            .new_string(&self.channel_name)
            .map_err(|e| jni_err("new_string(channel)", e))?;
        let j_method: JString = env
            .new_string(method)
            .map_err(|e| jni_err("new_string(method)", e))?;
        let j_args: JString = env
            .new_string(arguments.to_string())
            .map_err(|e| jni_err("new_string(arguments)", e))?;

        env.call_static_method(
            HOST_SHIM,
            "invokeMethod",
            "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;)V",
            &[
                JValue::Object(&j_channel),
                JValue::Object(&j_method),
                JValue::Object(&j_args),
            ],
        )
        .map_err(|e| jni_err("NativeBridgeHost.invokeMethod", e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MainThreadExecutor: queue + main looper drain
// ---------------------------------------------------------------------------

fn main_thread() -> &'static (QueuedExecutor, Mutex<MainThreadQueue>) {
    MAIN_THREAD.get_or_init(|| {
        let (executor, queue) = main_thread_channel();
        (executor, Mutex::new(queue))
    })
}

/// Queues tasks and asks the host to drain them on the main looper.
pub struct AndroidMainThread;

impl MainThreadExecutor for AndroidMainThread {
    fn post(&self, task: MainThreadTask) -> Result<()> {
        main_thread().0.post(task)?;

        let mut env = jni_env()?;
        env.call_static_method(HOST_SHIM, "requestMainThreadDrain", "()V", &[])
            .map_err(|e| jni_err("NativeBridgeHost.requestMainThreadDrain", e))?;
        Ok(())
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativeBridgeHost_nativeDrainMainThread(
    _env: JNIEnv,
    _class: JClass,
) {
    match main_thread().1.lock() {
        Ok(mut queue) => {
            queue.run_pending();
        }
        Err(_) => tracing::error!("Android: main thread queue poisoned"),
    }
}

// ---------------------------------------------------------------------------
// PurchasingListener callbacks: NativePurchasingListener.nativeOn*
// ---------------------------------------------------------------------------

/// Decode a JSON response from the shim and hand it to the listener.
///
/// Failures are logged, never thrown back into the JVM: the vendor SDK does
/// not redeliver.
fn deliver<T, F>(env: &mut JNIEnv<'_>, json: &JString<'_>, callback: &str, handler: F)
where
    T: DeserializeOwned,
    F: FnOnce(&dyn BillingListener, T),
{
    let text: String = match env.get_string(json) {
        Ok(s) => s.into(),
        Err(e) => {
            tracing::error!(callback, error = %e, "Android: unreadable callback payload");
            return;
        }
    };

    let response: T = match serde_json::from_str(&text) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(callback, error = %e, "Android: malformed callback payload");
            return;
        }
    };

    let listener = match LISTENER.read() {
        Ok(slot) => slot.clone(),
        Err(_) => {
            tracing::error!(callback, "Android: listener slot poisoned");
            return;
        }
    };

    match listener {
        Some(listener) => handler(listener.as_ref(), response),
        None => tracing::warn!(callback, "Android: callback with no registered listener"),
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativePurchasingListener_nativeOnProductDataResponse(
    mut env: JNIEnv,
    _this: JObject,
    json: JString,
) {
    deliver::<ProductDataResponse, _>(&mut env, &json, "onProductDataResponse", |l, r| {
        l.on_product_data_response(r)
    });
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativePurchasingListener_nativeOnPurchaseResponse(
    mut env: JNIEnv,
    _this: JObject,
    json: JString,
) {
    deliver::<PurchaseResponse, _>(&mut env, &json, "onPurchaseResponse", |l, r| {
        l.on_purchase_response(r)
    });
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativePurchasingListener_nativeOnPurchaseUpdatesResponse(
    mut env: JNIEnv,
    _this: JObject,
    json: JString,
) {
    deliver::<PurchaseUpdatesResponse, _>(&mut env, &json, "onPurchaseUpdatesResponse", |l, r| {
        l.on_purchase_updates_response(r)
    });
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_visha_airesume_iap_NativePurchasingListener_nativeOnUserDataResponse(
    mut env: JNIEnv,
    _this: JObject,
    json: JString,
) {
    deliver::<UserDataResponse, _>(&mut env, &json, "onUserDataResponse", |l, r| {
        l.on_user_data_response(r)
    });
}
