//! 最佳努力远端镜像模块
//!
//! 把保存成功的进度记录顺带推送到远端排行榜服务。
//! 本地写入是事实来源；推送失败只记日志，绝不向调用方抛错，
//! 断网 / 服务器不可用时应用照常离线工作。

use std::time::Duration;

use reqwest::Client;

use crate::storage::models::ProgressRecord;
use crate::storage::{StorageError, StorageResult};

/// 镜像配置
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// 排行榜 API 基础 URL
    pub api_base_url: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            timeout_secs: 10,
        }
    }
}

/// 远端成绩镜像
pub struct ScoreMirror {
    config: MirrorConfig,
    client: Client,
}

impl ScoreMirror {
    /// 创建新的镜像
    pub fn new(api_base_url: String) -> Self {
        let config = MirrorConfig {
            api_base_url,
            ..Default::default()
        };

        Self::with_config(config)
    }

    /// 使用自定义配置创建镜像
    pub fn with_config(config: MirrorConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// 推送单条进度记录到远端
    ///
    /// 需要观察推送结果的调用方（如设置页的"立即同步"）使用此方法；
    /// 常规保存链路走 [`push_detached`](Self::push_detached)。
    pub async fn push(&self, record: &ProgressRecord) -> StorageResult<()> {
        let url = format!("{}/scores", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StorageError::Sync(format!(
                "远端镜像被拒绝: HTTP {}",
                response.status()
            )))
        }
    }

    /// 后台分离推送（调用方不等待结果）
    ///
    /// 必须在 tokio 运行时内调用；失败只记 warn 日志。
    pub fn push_detached(&self, record: ProgressRecord) {
        let client = self.client.clone();
        let url = format!("{}/scores", self.config.api_base_url);

        tokio::spawn(async move {
            match client.post(&url).json(&record).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    log::warn!("进度镜像被远端拒绝: HTTP {}", response.status());
                }
                Err(e) => {
                    log::warn!("进度镜像推送失败: {}", e);
                }
            }
        });
    }
}
