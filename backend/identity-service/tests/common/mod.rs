#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use crypto_core::{Clock, ManualClock};
use ridehail_identity::config::{
    DatabaseSettings, EmailSettings, HasherSettings, JwtSettings, ResetSettings, Settings,
};
use ridehail_identity::db::InMemoryRepository;
use ridehail_identity::models::RegistrationRequest;
use ridehail_identity::services::Mailer;
use ridehail_identity::IdentityApp;
use std::sync::{Arc, Mutex};

pub const LINK_BASE: &str = "https://app.ridehail.dev/reset-password";

/// Captures every reset link instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Code from the most recent link
    pub fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let (_, link) = sent.last().expect("no reset link was sent");
        link.rsplit('/').next().unwrap().to_string()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_reset_link(&self, recipient: &str, link: &str) -> ridehail_identity::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), link.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub app: IdentityApp,
    pub repo: InMemoryRepository,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
}

pub fn settings() -> Settings {
    Settings {
        database: DatabaseSettings {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 1,
        },
        jwt: JwtSettings {
            secret: "integration-test-secret-0123456789abcdef".to_string(),
            issuer: "ridehail-identity".to_string(),
            access_ttl_secs: 86_400,
            refresh_ttl_secs: 604_800,
        },
        // Cheap cost keeps the suite fast
        hasher: HasherSettings {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        reset: ResetSettings {
            code_ttl_secs: 900,
            link_base_url: LINK_BASE.to_string(),
        },
        email: EmailSettings::default(),
    }
}

pub fn test_app() -> TestApp {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let repo = InMemoryRepository::new();
    let mailer = Arc::new(RecordingMailer::default());
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let app = IdentityApp::new(
        &settings(),
        Arc::new(repo.clone()),
        mailer.clone(),
        dyn_clock,
    )
    .expect("app");

    TestApp {
        app,
        repo,
        mailer,
        clock,
    }
}

pub fn registration(email: &str, password: &str) -> RegistrationRequest {
    RegistrationRequest {
        full_name: "Budi Santoso".to_string(),
        email: email.to_string(),
        phone_number: "+628123456789".to_string(),
        password: password.to_string(),
        password_confirmation: password.to_string(),
    }
}
