//! # 审查关卡

use axum::response::Response;

use super::client::ModerationClient;
use super::rejection::{rejection_error, rejection_response};
use crate::error::Result;
use crate::linfo;
use crate::logging::{LogComponent, LogStage};
use crate::setting::{ModerationRuntimeConfig, SafeCheckExempt};

/// 审查未通过时的处理方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub message: String,
    /// 是否封禁发起请求的用户，管理员永不封禁
    pub ban_user: bool,
    /// 是否以 400 错误返回；否则伪装成正常补全
    pub as_error: bool,
}

impl Rejection {
    #[must_use]
    pub fn into_response(self, model: &str, stream: bool) -> Response {
        if self.as_error {
            rejection_error(&self.message)
        } else {
            rejection_response(&self.message, model, stream)
        }
    }
}

/// 审查结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// 豁免分组，未审查
    Exempt,
    Allowed,
    Rejected(Rejection),
}

/// 一次请求所用的审查关卡，持有当时的选项快照
#[derive(Debug, Clone)]
pub struct ModerationGate {
    client: ModerationClient,
    config: ModerationRuntimeConfig,
    exempt: SafeCheckExempt,
}

impl ModerationGate {
    #[must_use]
    pub const fn new(
        client: ModerationClient,
        config: ModerationRuntimeConfig,
        exempt: SafeCheckExempt,
    ) -> Self {
        Self {
            client,
            config,
            exempt,
        }
    }

    pub async fn evaluate(&self, group: &str, is_admin: bool, inputs: &[String]) -> Result<Verdict> {
        if !self.exempt.should_check_group(group) {
            return Ok(Verdict::Exempt);
        }

        if !self.client.check(&self.config, inputs).await? {
            return Ok(Verdict::Allowed);
        }

        let rejection = Rejection {
            message: self.config.reject_message.clone(),
            ban_user: self.config.auto_ban && !is_admin,
            as_error: !self.config.no_error,
        };
        linfo!(
            "moderation",
            LogStage::Response,
            LogComponent::Moderation,
            "rejected",
            "内容审查未通过",
            group = group,
            ban_user = rejection.ban_user
        );
        Ok(Verdict::Rejected(rejection))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::setting::ModerationService;
    use rstest::rstest;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn flagging_server(flagged: bool) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [{"flagged": flagged}]})),
            )
            .mount(&server)
            .await;
        server
    }

    fn gate(server: &MockServer, auto_ban: bool, no_error: bool, exempt: SafeCheckExempt) -> ModerationGate {
        let config = ModerationRuntimeConfig {
            service: ModerationService::Custom,
            api_url: format!("{}/v1/moderations", server.uri()),
            api_key: "sk-test".to_string(),
            model: "text-moderation-latest".to_string(),
            auto_ban,
            no_error,
            reject_message: "blocked".to_string(),
        };
        ModerationGate::new(
            ModerationClient::new(Duration::from_secs(3)).unwrap(),
            config,
            exempt,
        )
    }

    fn inputs() -> Vec<String> {
        vec!["something".to_string()]
    }

    #[tokio::test]
    async fn clean_input_is_allowed() {
        let server = flagging_server(false).await;
        let verdict = gate(&server, true, false, SafeCheckExempt::default())
            .evaluate("default", false, &inputs())
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Allowed);
    }

    #[rstest]
    #[case(true, false, true, true)]
    #[case(true, true, false, true)]
    #[case(false, false, false, true)]
    #[tokio::test]
    async fn flagged_input_is_rejected(
        #[case] auto_ban: bool,
        #[case] is_admin: bool,
        #[case] expect_ban: bool,
        #[case] expect_error: bool,
    ) {
        let server = flagging_server(true).await;
        let verdict = gate(&server, auto_ban, false, SafeCheckExempt::default())
            .evaluate("default", is_admin, &inputs())
            .await
            .unwrap();

        assert_eq!(
            verdict,
            Verdict::Rejected(Rejection {
                message: "blocked".to_string(),
                ban_user: expect_ban,
                as_error: expect_error,
            })
        );
    }

    #[tokio::test]
    async fn no_error_returns_completion() {
        let server = flagging_server(true).await;
        let verdict = gate(&server, false, true, SafeCheckExempt::default())
            .evaluate("default", false, &inputs())
            .await
            .unwrap();

        let Verdict::Rejected(rejection) = verdict else {
            panic!("expected rejection");
        };
        assert!(!rejection.as_error);
        assert_eq!(
            rejection.into_response("gpt-4o", false).status(),
            axum::http::StatusCode::OK
        );
    }

    #[tokio::test]
    async fn exempt_group_is_not_checked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let exempt = SafeCheckExempt {
            enabled: true,
            group: "vip".to_string(),
        };
        let verdict = gate(&server, true, false, exempt)
            .evaluate("vip", false, &inputs())
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Exempt);
    }
}
