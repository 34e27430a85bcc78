// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Authorization and schema visibility differences between the surfaces.

use apiary_plugins::{
    ApiSurface, CallbackListener, HookError, HookSet, LifecycleHook, RequestContext,
    RequestInfo, RequestListener, ServerPlugin, SharedPlugin,
};
use apiary_testing::{
    fixtures, ClientError, InitOptions, InvocationLog, RecordingPlugin, TestEnvironment,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

async fn setup(plugins: Vec<SharedPlugin>) -> TestEnvironment {
    let options = InitOptions::new(fixtures::initial_data().unwrap());
    TestEnvironment::init(fixtures::test_config(), plugins, options)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_unauthenticated_admin_query_never_reaches_plugins() {
    let log = InvocationLog::new();
    let env = setup(vec![Arc::new(RecordingPlugin::new(&log))]).await;
    log.reset();

    let admin = env.admin_client();
    assert!(!admin.is_logged_in());
    let err = admin
        .query(r#"{ product(id: "T_1") { id } }"#)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.code(), Some("UNAUTHORIZED"));
    assert!(log.events().is_empty());

    admin.as_super_admin().await.unwrap();
    admin.query(r#"{ product(id: "T_1") { id } }"#).await.unwrap();
    assert_eq!(log.count(LifecycleHook::RequestDidStart), 1);

    admin.logout();
    assert!(admin.query(r#"{ products { id } }"#).await.is_err());
    assert_eq!(log.count(LifecycleHook::RequestDidStart), 1);

    env.destroy().await;
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let env = setup(vec![]).await;

    let err = env
        .admin_client()
        .login("superadmin", "hunter2")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Query { status: 401, .. }));
    assert!(!env.admin_client().is_logged_in());

    env.destroy().await;
}

#[tokio::test]
async fn test_enabled_field_is_admin_only() {
    let log = InvocationLog::new();
    let env = setup(vec![Arc::new(RecordingPlugin::new(&log))]).await;
    env.admin_client().as_super_admin().await.unwrap();
    log.reset();

    let document = r#"{ product(id: "T_1") { id enabled } }"#;

    let shop = env.shop_client().query_with_errors(document).await.unwrap();
    assert_eq!(shop.status, 200);
    assert!(shop.data.is_none());
    assert_eq!(shop.errors[0].code(), Some("GRAPHQL_VALIDATION_FAILED"));
    // Resolution failed: the request started but no response hook ran.
    assert_eq!(log.count(LifecycleHook::RequestDidStart), 1);
    assert_eq!(log.count(LifecycleHook::WillSendResponse), 0);

    let admin = env.admin_client().query(document).await.unwrap();
    assert_eq!(admin, json!({"product": {"id": "T_1", "enabled": true}}));
    assert_eq!(log.count(LifecycleHook::RequestDidStart), 2);
    assert_eq!(log.count(LifecycleHook::WillSendResponse), 1);

    env.destroy().await;
}

#[tokio::test]
async fn test_disabled_products_are_hidden_from_shop() {
    let env = setup(vec![]).await;
    env.admin_client().as_super_admin().await.unwrap();

    let document = r#"{ product(id: "T_5") { name } }"#;
    let shop = env.shop_client().query(document).await.unwrap();
    assert_eq!(shop, json!({"product": null}));
    let admin = env.admin_client().query(document).await.unwrap();
    assert_eq!(admin, json!({"product": {"name": "Clacky Keyboard"}}));

    let list = r#"{ products { id } }"#;
    let count = |data: &Value| data["products"].as_array().map(Vec::len);
    assert_eq!(count(&env.shop_client().query(list).await.unwrap()), Some(4));
    assert_eq!(count(&env.admin_client().query(list).await.unwrap()), Some(5));

    env.destroy().await;
}

#[tokio::test]
async fn test_administrators_only_on_admin_surface() {
    let env = setup(vec![]).await;
    env.admin_client().as_super_admin().await.unwrap();

    let document = r#"{ administrators { identifier } }"#;
    let admin = env.admin_client().query(document).await.unwrap();
    assert_eq!(
        admin,
        json!({"administrators": [
            {"identifier": "superadmin"},
            {"identifier": "editor@test.com"},
        ]})
    );

    let shop = env.shop_client().query(document).await.unwrap_err();
    assert_eq!(shop.code(), Some("GRAPHQL_VALIDATION_FAILED"));

    env.destroy().await;
}

/// Fails `will_send_response` for requests named `Boom`.
struct BoomPlugin;

#[async_trait]
impl ServerPlugin for BoomPlugin {
    fn name(&self) -> &str {
        "boom"
    }

    fn hooks(&self) -> HookSet {
        HookSet::from(LifecycleHook::RequestDidStart)
    }

    async fn request_did_start(
        &self,
        _request: &RequestInfo,
    ) -> Result<Option<Box<dyn RequestListener>>, HookError> {
        Ok(Some(Box::new(CallbackListener::new(|context: &RequestContext| {
            if context.request().operation_name() == Some("Boom") {
                return Err(HookError::failed("boom"));
            }
            Ok(())
        }))))
    }
}

#[tokio::test]
async fn test_response_hook_failure_is_isolated_to_its_request() {
    let log = InvocationLog::new();
    let env = setup(vec![
        Arc::new(BoomPlugin),
        Arc::new(RecordingPlugin::new(&log)),
    ])
    .await;

    let failed = env
        .shop_client()
        .query_with_errors(r#"query Boom { products { id } }"#)
        .await
        .unwrap();
    assert_eq!(failed.status, 500);
    assert_eq!(failed.errors[0].code(), Some("PLUGIN_HOOK_FAILED"));
    assert_eq!(failed.errors[0].extensions["plugin"], "boom");
    assert_eq!(failed.errors[0].extensions["hook"], "willSendResponse");
    // Listeners after the failing one are not called.
    assert_eq!(log.count(LifecycleHook::WillSendResponse), 0);

    let ok = env
        .shop_client()
        .query(r#"query Fine { product(id: "T_2") { name } }"#)
        .await
        .unwrap();
    assert_eq!(ok, json!({"product": {"name": "Curvy Monitor"}}));
    assert_eq!(log.count(LifecycleHook::RequestDidStart), 2);
    assert_eq!(log.count(LifecycleHook::WillSendResponse), 1);

    env.destroy().await;
}

#[tokio::test]
async fn test_health_is_outside_the_plugin_pipeline() {
    let log = InvocationLog::new();
    let env = setup(vec![Arc::new(RecordingPlugin::new(&log))]).await;
    log.reset();

    for surface in ApiSurface::ALL {
        let url = format!("{}/health", env.server().base_url(surface).unwrap());
        let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["surface"], surface.as_str());
        assert_eq!(body["plugins"], 1);
    }
    assert!(log.events().is_empty());

    env.destroy().await;
}
