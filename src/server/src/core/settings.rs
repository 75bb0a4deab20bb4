//! 平台设置（单条记录）与维护模式

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::LotteryError;

pub const DEFAULT_MAINTENANCE_MESSAGE: &str = "The platform is under maintenance. Please try again later.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub maintenance_mode: bool,
    pub maintenance_message: String,
    pub registration_enabled: bool,
    pub min_ticket_price: u64,
    pub max_ticket_price: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            maintenance_mode: false,
            maintenance_message: DEFAULT_MAINTENANCE_MESSAGE.to_string(),
            registration_enabled: true,
            min_ticket_price: 10,
            max_ticket_price: 1000,
        }
    }
}

/// 部分更新，只修改提供的字段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub maintenance_mode: Option<bool>,
    pub maintenance_message: Option<String>,
    pub registration_enabled: Option<bool>,
    pub min_ticket_price: Option<u64>,
    pub max_ticket_price: Option<u64>,
}

#[derive(Clone, Default)]
pub struct SettingsService {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsService {
    pub fn new(initial: Settings) -> Self {
        Self { inner: Arc::new(RwLock::new(initial)) }
    }

    pub async fn get(&self) -> Settings {
        self.inner.read().await.clone()
    }

    /// 维护中时返回维护提示
    pub async fn maintenance(&self) -> Option<String> {
        let s = self.inner.read().await;
        s.maintenance_mode.then(|| s.maintenance_message.clone())
    }

    pub async fn update(&self, update: SettingsUpdate) -> Result<Settings, LotteryError> {
        let mut g = self.inner.write().await;
        let mut next = g.clone();
        if let Some(v) = update.maintenance_mode { next.maintenance_mode = v; }
        if let Some(v) = update.maintenance_message { next.maintenance_message = v; }
        if let Some(v) = update.registration_enabled { next.registration_enabled = v; }
        if let Some(v) = update.min_ticket_price { next.min_ticket_price = v; }
        if let Some(v) = update.max_ticket_price { next.max_ticket_price = v; }

        if next.min_ticket_price == 0 || next.min_ticket_price > next.max_ticket_price {
            return Err(LotteryError::InvalidInput("ticket price range is invalid".into()));
        }
        if next.maintenance_mode != g.maintenance_mode {
            info!("维护模式切换: {}", next.maintenance_mode);
        }
        *g = next.clone();
        Ok(next)
    }

    pub async fn check_registration_open(&self) -> Result<(), LotteryError> {
        if self.inner.read().await.registration_enabled {
            Ok(())
        } else {
            Err(LotteryError::RegistrationDisabled)
        }
    }

    pub async fn check_ticket_price(&self, price: u64) -> Result<(), LotteryError> {
        let s = self.inner.read().await;
        if price < s.min_ticket_price || price > s.max_ticket_price {
            return Err(LotteryError::InvalidInput(format!(
                "ticket price must be between {} and {}",
                s.min_ticket_price, s.max_ticket_price
            )));
        }
        Ok(())
    }
}
