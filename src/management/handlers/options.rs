//! # 选项管理处理器

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::logging::{LogComponent, LogStage};
use crate::management::response;
use crate::management::server::AppState;
use crate::{linfo, lwarn};

/// `PUT /api/option/` 请求体
///
/// `value` 一律为文本；布尔等值由调用方先行转成字符串。
#[derive(Debug, Deserialize)]
pub struct UpdateOptionRequest {
    pub key: String,
    pub value: String,
}

/// 列出全部选项（敏感值脱敏）
pub async fn list_options(State(state): State<AppState>) -> axum::response::Response {
    response::success(state.options.list_masked().await)
}

/// 更新单个选项
pub async fn update_option(
    State(state): State<AppState>,
    Json(request): Json<UpdateOptionRequest>,
) -> axum::response::Response {
    match state.options.update(&request.key, &request.value).await {
        Ok(()) => {
            linfo!(
                "system",
                LogStage::Response,
                LogComponent::OptionStore,
                "option_saved",
                "选项保存成功",
                key = request.key
            );
            response::success_without_data("保存成功")
        }
        Err(err) => {
            lwarn!(
                "system",
                LogStage::Error,
                LogComponent::OptionStore,
                "option_save_failed",
                &format!("选项保存失败: {err}"),
                key = request.key
            );
            response::app_error(err)
        }
    }
}
