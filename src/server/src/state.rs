use std::sync::Arc;

use warp::http::HeaderMap;

use crate::config::ServerConfig;
use crate::core::closer::LotteryCloser;
use crate::core::participation::ParticipationService;
use crate::core::settings::{Settings, SettingsService};
use crate::core::store::MemoryStore;
use crate::errors::LotteryError;
use crate::types::header_admin_token;

/// 服务使用的存储实现
pub type AppStore = MemoryStore;

/// 服务器状态
#[derive(Clone)]
pub struct ServerState {
    pub(crate) store: Arc<AppStore>,
    pub(crate) closer: LotteryCloser<AppStore>,
    pub(crate) participation: Arc<ParticipationService<AppStore>>,
    pub(crate) settings: SettingsService,
    pub(crate) config: ServerConfig,
}

impl ServerState {
    /// 按配置打开存储（配置了 DATA_FILE 时从快照加载）
    pub async fn new(config: ServerConfig) -> Result<Self, LotteryError> {
        let store = match &config.data_file {
            Some(path) => MemoryStore::open(path).await?,
            None => MemoryStore::new(),
        };
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<AppStore>, config: ServerConfig) -> Self {
        Self {
            closer: LotteryCloser::new(Arc::clone(&store)),
            participation: Arc::new(ParticipationService::new(Arc::clone(&store), config.lottery_defaults.clone())),
            settings: SettingsService::new(Settings::default()),
            store,
            config,
        }
    }

    pub fn store(&self) -> Arc<AppStore> {
        Arc::clone(&self.store)
    }

    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn is_admin(&self, headers: &HeaderMap) -> bool {
        match (&self.config.admin_token, header_admin_token(headers)) {
            (Some(expected), Some(given)) => *expected == given,
            _ => false,
        }
    }
}
