//! # 审查设置表单
//!
//! 持有两份设置：`inputs` 为操作者正在编辑的副本，`baseline` 为最近一次
//! 同步到的快照。提交时只写回两者不同的键，所有写请求并发发出，
//! 全部结束后统一汇报结果并通知外部选项存储刷新一次。

use std::collections::HashMap;

use futures::future::join_all;

use super::client::{OptionsBackend, RefreshHandle};
use super::notice::{Notice, Notifier};
use crate::logging::{LogComponent, LogStage};
use crate::setting::{ModerationService, ModerationSettings, OptionUpdate};
use crate::{ldebug, linfo, lwarn};

pub const MSG_NOTHING_CHANGED: &str = "你似乎并没有修改什么";
pub const MSG_SAVED: &str = "保存成功";
pub const MSG_PARTIAL_FAILURE: &str = "部分保存失败，请重试";
pub const MSG_FAILED: &str = "保存失败，请重试";

/// 单个字段的编辑
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Service(ModerationService),
    ApiUrl(String),
    ApiKey(String),
    Model(String),
    AutoBan(bool),
    NoError(bool),
    RejectMessage(String),
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 没有变化，未发出请求
    NothingToSave,
    /// 校验未通过，未发出请求
    Invalid {
        field: Option<String>,
        message: String,
    },
    /// 全部写入成功
    Saved { count: usize },
    /// 部分写入失败
    PartialFailure { failed: Vec<String>, total: usize },
    /// 全部写入失败
    Failed { total: usize },
}

impl SubmitOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::NothingToSave | Self::Saved { .. })
    }
}

/// 审查设置表单控制器
#[derive(Debug, Clone, Default)]
pub struct ModerationSettingsForm {
    inputs: ModerationSettings,
    baseline: ModerationSettings,
}

impl ModerationSettingsForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_options(options: &HashMap<String, String>) -> Self {
        let mut form = Self::new();
        form.sync_from_options(options);
        form
    }

    #[must_use]
    pub const fn inputs(&self) -> &ModerationSettings {
        &self.inputs
    }

    #[must_use]
    pub const fn baseline(&self) -> &ModerationSettings {
        &self.baseline
    }

    /// 收到新的选项快照：覆盖编辑副本，同时作为新的基线
    pub fn sync_from_options(&mut self, options: &HashMap<String, String>) {
        let settings = ModerationSettings::from_options(options);
        self.baseline = settings.clone();
        self.inputs = settings;
    }

    /// 应用一次编辑，切换服务来源时立即套用约束
    pub fn apply(&mut self, edit: FieldEdit) {
        match edit {
            FieldEdit::Service(service) => self.inputs.set_service(service),
            FieldEdit::ApiUrl(value) => self.inputs.api_url = value,
            FieldEdit::ApiKey(value) => self.inputs.api_key = value,
            FieldEdit::Model(value) => self.inputs.model = value,
            FieldEdit::AutoBan(value) => self.inputs.auto_ban = value,
            FieldEdit::NoError(value) => self.inputs.no_error = value,
            FieldEdit::RejectMessage(value) => self.inputs.reject_message = value,
        }
    }

    #[must_use]
    pub fn pending_updates(&self) -> Vec<OptionUpdate> {
        self.inputs.diff(&self.baseline)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inputs != self.baseline
    }

    /// 提交变化的键
    ///
    /// 发出过请求时，无论成败都会调用一次 `refresh`；基线只在外部存储
    /// 推送新快照（`sync_from_options`）后更新。
    pub async fn submit<B, R>(
        &self,
        backend: &B,
        refresh: &R,
        notifier: &dyn Notifier,
    ) -> SubmitOutcome
    where
        B: OptionsBackend + ?Sized,
        R: RefreshHandle + ?Sized,
    {
        let updates = self.pending_updates();
        if updates.is_empty() {
            notifier.notify(Notice::warning(MSG_NOTHING_CHANGED));
            return SubmitOutcome::NothingToSave;
        }

        if let Err(err) = self.inputs.validate() {
            let message = err.to_string();
            notifier.notify(Notice::error(message.clone()));
            return SubmitOutcome::Invalid {
                field: err.field().map(str::to_string),
                message,
            };
        }

        let total = updates.len();
        ldebug!(
            "console",
            LogStage::ExternalApi,
            LogComponent::SettingsForm,
            "submit",
            "提交审查设置",
            keys = updates.iter().map(|u| u.key.as_str()).collect::<Vec<_>>()
        );

        let results = join_all(
            updates
                .iter()
                .map(|update| backend.update_option(&update.key, &update.value)),
        )
        .await;

        let failed: Vec<String> = updates
            .iter()
            .zip(results)
            .filter_map(|(update, result)| match result {
                Ok(()) => None,
                Err(err) => {
                    lwarn!(
                        "console",
                        LogStage::Response,
                        LogComponent::SettingsForm,
                        "submit_key_failed",
                        &err.to_string(),
                        key = update.key
                    );
                    Some(update.key.clone())
                }
            })
            .collect();

        let outcome = if failed.is_empty() {
            notifier.notify(Notice::success(MSG_SAVED));
            SubmitOutcome::Saved { count: total }
        } else if failed.len() == total {
            notifier.notify(Notice::error(MSG_FAILED));
            SubmitOutcome::Failed { total }
        } else {
            notifier.notify(Notice::error(MSG_PARTIAL_FAILURE));
            SubmitOutcome::PartialFailure { failed, total }
        };

        linfo!(
            "console",
            LogStage::Response,
            LogComponent::SettingsForm,
            "submit_done",
            "审查设置提交结束",
            outcome = outcome
        );

        refresh.refresh().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::console::notice::NoticeLevel;
    use crate::error::{GatewayError, Result};
    use crate::setting::{DEFAULT_MODERATION_MODEL, keys};

    #[derive(Default)]
    struct MockBackend {
        calls: Mutex<Vec<(String, String)>>,
        failing: HashSet<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockBackend {
        fn failing(keys: &[&str]) -> Self {
            Self {
                failing: keys.iter().map(|k| (*k).to_string()).collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort();
            calls
        }
    }

    #[async_trait]
    impl OptionsBackend for MockBackend {
        async fn update_option(&self, key: &str, value: &str) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.calls
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string()));
            if self.failing.contains(key) {
                return Err(GatewayError::network(format!("{key} rejected")));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingRefresh(AtomicUsize);

    #[async_trait]
    impl RefreshHandle for CountingRefresh {
        async fn refresh(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<Notice>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    impl RecordingNotifier {
        fn notices(&self) -> Vec<Notice> {
            self.0.lock().unwrap().clone()
        }
    }

    fn custom_options() -> HashMap<String, String> {
        HashMap::from([
            (keys::SERVICE.to_string(), "custom".to_string()),
            (
                keys::API_URL.to_string(),
                "https://mod.example.com/v1/moderations".to_string(),
            ),
            (keys::API_KEY.to_string(), "sk-test".to_string()),
            (keys::MODEL.to_string(), "omni-moderation-latest".to_string()),
            (keys::AUTO_BAN.to_string(), "false".to_string()),
        ])
    }

    #[tokio::test]
    async fn unchanged_form_sends_nothing() {
        let form = ModerationSettingsForm::from_options(&custom_options());
        let backend = MockBackend::default();
        let refresh = CountingRefresh::default();
        let notifier = RecordingNotifier::default();

        let outcome = form.submit(&backend, &refresh, &notifier).await;

        assert_eq!(outcome, SubmitOutcome::NothingToSave);
        assert!(backend.calls().is_empty());
        assert_eq!(refresh.0.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.notices(), vec![Notice::warning(MSG_NOTHING_CHANGED)]);
    }

    #[tokio::test]
    async fn only_changed_keys_are_sent_as_text() {
        let mut form = ModerationSettingsForm::from_options(&custom_options());
        form.apply(FieldEdit::AutoBan(true));
        form.apply(FieldEdit::RejectMessage("blocked".to_string()));

        let backend = MockBackend::default();
        let refresh = CountingRefresh::default();
        let notifier = RecordingNotifier::default();
        let outcome = form.submit(&backend, &refresh, &notifier).await;

        assert_eq!(outcome, SubmitOutcome::Saved { count: 2 });
        assert_eq!(
            backend.calls(),
            vec![
                (keys::AUTO_BAN.to_string(), "true".to_string()),
                (keys::REJECT_MESSAGE.to_string(), "blocked".to_string()),
            ]
        );
        assert_eq!(refresh.0.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.notices(), vec![Notice::success(MSG_SAVED)]);
    }

    #[tokio::test]
    async fn requests_are_issued_concurrently() {
        let mut form = ModerationSettingsForm::from_options(&custom_options());
        form.apply(FieldEdit::AutoBan(true));
        form.apply(FieldEdit::NoError(true));
        form.apply(FieldEdit::Model("text-moderation-stable".to_string()));

        let backend = MockBackend::default();
        form.submit(&backend, &CountingRefresh::default(), &RecordingNotifier::default())
            .await;

        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn switching_to_builtin_clears_credentials_on_save() {
        let mut form = ModerationSettingsForm::from_options(&custom_options());
        form.apply(FieldEdit::Service(ModerationService::Builtin));

        assert!(form.inputs().api_url.is_empty());
        assert!(form.inputs().api_key.is_empty());
        assert!(form.inputs().model.is_empty());

        let backend = MockBackend::default();
        let outcome = form
            .submit(&backend, &CountingRefresh::default(), &RecordingNotifier::default())
            .await;

        assert_eq!(outcome, SubmitOutcome::Saved { count: 4 });
        assert_eq!(
            backend.calls(),
            vec![
                (keys::API_KEY.to_string(), String::new()),
                (keys::API_URL.to_string(), String::new()),
                (keys::MODEL.to_string(), String::new()),
                (keys::SERVICE.to_string(), "builtin".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn switching_to_custom_fills_default_model() {
        let mut form = ModerationSettingsForm::new();
        form.apply(FieldEdit::Service(ModerationService::Custom));
        assert_eq!(form.inputs().model, DEFAULT_MODERATION_MODEL);
    }

    #[tokio::test]
    async fn partial_failure_is_reported_once() {
        let mut form = ModerationSettingsForm::from_options(&custom_options());
        form.apply(FieldEdit::AutoBan(true));
        form.apply(FieldEdit::NoError(true));

        let backend = MockBackend::failing(&[keys::NO_ERROR]);
        let refresh = CountingRefresh::default();
        let notifier = RecordingNotifier::default();
        let outcome = form.submit(&backend, &refresh, &notifier).await;

        assert_eq!(
            outcome,
            SubmitOutcome::PartialFailure {
                failed: vec![keys::NO_ERROR.to_string()],
                total: 2,
            }
        );
        assert_eq!(backend.calls().len(), 2);
        assert_eq!(refresh.0.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.notices(), vec![Notice::error(MSG_PARTIAL_FAILURE)]);
    }

    #[tokio::test]
    async fn total_failure_uses_generic_message() {
        let mut form = ModerationSettingsForm::from_options(&custom_options());
        form.apply(FieldEdit::AutoBan(true));

        let backend = MockBackend::failing(&[keys::AUTO_BAN]);
        let refresh = CountingRefresh::default();
        let notifier = RecordingNotifier::default();
        let outcome = form.submit(&backend, &refresh, &notifier).await;

        assert_eq!(outcome, SubmitOutcome::Failed { total: 1 });
        assert_eq!(refresh.0.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.notices(), vec![Notice::error(MSG_FAILED)]);
        assert!(form.is_dirty());
    }

    #[tokio::test]
    async fn invalid_custom_settings_are_not_sent() {
        let mut form = ModerationSettingsForm::new();
        form.apply(FieldEdit::Service(ModerationService::Custom));
        form.apply(FieldEdit::ApiKey("sk-test".to_string()));

        let backend = MockBackend::default();
        let refresh = CountingRefresh::default();
        let notifier = RecordingNotifier::default();
        let outcome = form.submit(&backend, &refresh, &notifier).await;

        match outcome {
            SubmitOutcome::Invalid { field, .. } => {
                assert_eq!(field.as_deref(), Some(keys::API_URL));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(backend.calls().is_empty());
        assert_eq!(refresh.0.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.notices()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn sync_overwrites_edits_and_baseline() {
        let mut form = ModerationSettingsForm::from_options(&custom_options());
        form.apply(FieldEdit::AutoBan(true));
        assert!(form.is_dirty());

        let mut fresh = custom_options();
        fresh.insert(keys::AUTO_BAN.to_string(), "true".to_string());
        form.sync_from_options(&fresh);

        assert!(!form.is_dirty());
        assert!(form.inputs().auto_ban);
        assert!(form.pending_updates().is_empty());
    }
}
