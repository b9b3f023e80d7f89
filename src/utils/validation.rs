use crate::error::{AppError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// 验证频道用户名格式
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("用户名不能为空".to_string()));
    }

    if username.len() < 3 {
        return Err(AppError::Validation("用户名至少需要3个字符".to_string()));
    }

    if username.len() > 30 {
        return Err(AppError::Validation("用户名不能超过30个字符".to_string()));
    }

    // 用户名只能包含字母、数字、下划线和连字符
    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let pattern = USERNAME_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());
    if !pattern.is_match(username) {
        return Err(AppError::Validation("用户名只能包含字母、数字、下划线和连字符".to_string()));
    }

    Ok(())
}

/// 验证显示名称格式
pub fn validate_display_name(display_name: &str) -> Result<()> {
    if display_name.trim().is_empty() {
        return Err(AppError::Validation("显示名称不能为空".to_string()));
    }

    if display_name.chars().count() > 50 {
        return Err(AppError::Validation("显示名称不能超过50个字符".to_string()));
    }

    Ok(())
}

/// 截断引用的内容摘录，保证不会在 UTF-8 字符中间断开
pub fn truncate_excerpt(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut excerpt: String = content.chars().take(max_chars).collect();
    excerpt.push('…');
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        // 有效用户名
        assert!(validate_username("user123").is_ok());
        assert!(validate_username("test_user").is_ok());
        assert!(validate_username("user-name").is_ok());

        // 无效用户名
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("user@name").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("John Doe").is_ok());
        assert!(validate_display_name("用户姓名").is_ok());

        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_truncate_excerpt_short_content_untouched() {
        assert_eq!(truncate_excerpt("hello", 100), "hello");
    }

    #[test]
    fn test_truncate_excerpt_appends_ellipsis() {
        let long = "a".repeat(150);
        let out = truncate_excerpt(&long, 100);
        assert_eq!(out.chars().count(), 101);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_truncate_excerpt_multibyte_boundary() {
        // 多字节字符不会被截断在中间
        let content = "视频".repeat(80);
        let out = truncate_excerpt(&content, 100);
        assert_eq!(out.chars().count(), 101);
    }
}
