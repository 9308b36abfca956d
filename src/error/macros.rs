//! # 错误处理宏

/// 确保条件成立，否则返回带字段的验证错误
#[macro_export]
macro_rules! ensure_valid {
    ($cond:expr, $field:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::error::GatewayError::management_validation(
                $msg,
                Some($field.to_string()),
            ));
        }
    };
}
