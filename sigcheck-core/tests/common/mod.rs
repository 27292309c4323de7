//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use sigcheck_core::{
    AppState, AuthProvider, MemoryBackend, NewSignatureRecord, SignUpRequest, SignatureRecord,
    SignatureStore,
};

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "Secret1";

/// A confirmed, signed-in user with one signature record.
pub async fn signed_in_with_record() -> (Arc<MemoryBackend>, Arc<AppState>, SignatureRecord) {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .sign_up(SignUpRequest {
            name: "Ada",
            email: EMAIL,
            password: PASSWORD,
        })
        .await
        .expect("sign-up");
    let code = backend.pending_otp(EMAIL).expect("code issued");
    backend.verify_otp(EMAIL, &code).await.expect("verify");
    let session = backend
        .sign_in_with_password(EMAIL, PASSWORD)
        .await
        .expect("sign-in");

    let record = backend
        .insert_signature(
            &session.access_token,
            &NewSignatureRecord {
                title: "President Signature".into(),
                author: "Office".into(),
                original_image_encoded: "b3JpZ2luYWw=".into(),
                scanned_image_encoded: "c2Nhbm5lZA==".into(),
                user_id: session.user_id.clone(),
            },
        )
        .await
        .expect("insert");

    (backend, Arc::new(AppState::with_session(session)), record)
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });
    format!("http://{addr}")
}
