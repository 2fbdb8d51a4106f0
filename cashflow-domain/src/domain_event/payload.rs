//! 事件载荷文档（Payload）
//!
//! 事件在日志与投影边界上以“字段名 → 动态标量”的文档形式存在。
//! 每个字段同时以标识符风格键（如 `CategoryID`）与小写下划线键（如 `category_id`）
//! 写入和读取，以兼容在命名约定上不一致的生产者/消费者。
//!
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 载荷中的动态标量值
///
/// 反序列化时按声明顺序尝试；经过文本序列化后时间戳会退化为 `Text`，
/// 由读取端按 [`parse_timestamp`] 的格式列表重新解析。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Text(value)
    }
}

impl From<f64> for PayloadValue {
    fn from(value: f64) -> Self {
        PayloadValue::Float(value)
    }
}

impl From<f32> for PayloadValue {
    fn from(value: f32) -> Self {
        PayloadValue::Float(f64::from(value))
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Int(value)
    }
}

impl From<i32> for PayloadValue {
    fn from(value: i32) -> Self {
        PayloadValue::Int(i64::from(value))
    }
}

impl From<DateTime<Utc>> for PayloadValue {
    fn from(value: DateTime<Utc>) -> Self {
        PayloadValue::Timestamp(value)
    }
}

/// 载荷字段：一对兼容键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadField {
    ident: &'static str,
    snake: &'static str,
}

impl PayloadField {
    pub const fn new(ident: &'static str, snake: &'static str) -> Self {
        Self { ident, snake }
    }

    pub const fn ident(&self) -> &'static str {
        self.ident
    }

    pub const fn snake(&self) -> &'static str {
        self.snake
    }

    /// 读取时的查找顺序：标识符风格优先
    pub fn keys(&self) -> [&'static str; 2] {
        [self.ident, self.snake]
    }
}

pub mod fields {
    use super::PayloadField;

    pub const CATEGORY_ID: PayloadField = PayloadField::new("CategoryID", "category_id");
    pub const NAME: PayloadField = PayloadField::new("Name", "name");
    pub const EXPENSE_ID: PayloadField = PayloadField::new("ExpenseID", "expense_id");
    pub const INCOME_ID: PayloadField = PayloadField::new("IncomeID", "income_id");
    pub const AMOUNT: PayloadField = PayloadField::new("Amount", "amount");
    pub const DESCRIPTION: PayloadField = PayloadField::new("Description", "description");
    pub const DATE: PayloadField = PayloadField::new("Date", "date");
}

/// 载荷文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, PayloadValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以两种命名约定同时写入字段
    pub fn insert(&mut self, field: PayloadField, value: impl Into<PayloadValue>) {
        let value = value.into();
        self.0.insert(field.snake.to_string(), value.clone());
        self.0.insert(field.ident.to_string(), value);
    }

    /// 按原始键写入（用于兼容单一命名约定的外部生产者）
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PayloadValue)> {
        self.0.iter()
    }

    /// 读取字符串字段；两个键都不是字符串时返回 `None`
    pub fn text(&self, field: PayloadField) -> Option<&str> {
        field.keys().into_iter().find_map(|key| match self.0.get(key) {
            Some(PayloadValue::Text(s)) => Some(s.as_str()),
            _ => None,
        })
    }

    /// 读取可选文本；空字符串视为缺失
    pub fn optional_text(&self, field: PayloadField) -> Option<String> {
        field.keys().into_iter().find_map(|key| match self.0.get(key) {
            Some(PayloadValue::Text(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
    }

    /// 读取金额，整型与浮点表示统一转换为 `f64`
    pub fn amount(&self, field: PayloadField) -> Option<f64> {
        field.keys().into_iter().find_map(|key| match self.0.get(key) {
            Some(PayloadValue::Float(v)) => Some(*v),
            Some(PayloadValue::Int(v)) => Some(*v as f64),
            _ => None,
        })
    }

    /// 读取时间戳：文本按格式列表解析，结构化时间戳直接接受
    pub fn timestamp(&self, field: PayloadField) -> Option<DateTime<Utc>> {
        field.keys().into_iter().find_map(|key| match self.0.get(key) {
            Some(PayloadValue::Text(s)) => parse_timestamp(s),
            Some(PayloadValue::Timestamp(ts)) => Some(*ts),
            _ => None,
        })
    }
}

/// 无时区信息的回退格式，全部按 UTC 解释
const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 按顺序尝试：RFC 3339（带偏移）、UTC 小数秒、无偏移、空格分隔、纯日期
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn insert_writes_both_conventions() {
        let mut payload = Payload::new();
        payload.insert(fields::CATEGORY_ID, "cat-1");

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.raw("CategoryID"), Some(&PayloadValue::from("cat-1")));
        assert_eq!(payload.raw("category_id"), Some(&PayloadValue::from("cat-1")));
    }

    #[test]
    fn lookup_tolerates_either_key() {
        let mut snake_only = Payload::new();
        snake_only.insert_raw("name", "Food");
        assert_eq!(snake_only.text(fields::NAME), Some("Food"));

        let mut ident_only = Payload::new();
        ident_only.insert_raw("Name", "Rent");
        assert_eq!(ident_only.text(fields::NAME), Some("Rent"));

        // 标识符键类型不符时回落到下划线键
        let mut mixed = Payload::new();
        mixed.insert_raw("Name", 3_i64);
        mixed.insert_raw("name", "Transport");
        assert_eq!(mixed.text(fields::NAME), Some("Transport"));
    }

    #[test]
    fn amount_coerces_numeric_representations() {
        let cases: Vec<(PayloadValue, f64)> = vec![
            (PayloadValue::from(50_000_i32), 50_000.0),
            (PayloadValue::from(75_000_i64), 75_000.0),
            (PayloadValue::from(12.5_f32), 12.5),
            (PayloadValue::from(99.75_f64), 99.75),
        ];

        for (value, expected) in cases {
            let mut payload = Payload::new();
            payload.insert_raw("Amount", value);
            assert_eq!(payload.amount(fields::AMOUNT), Some(expected));
        }

        let mut text = Payload::new();
        text.insert_raw("amount", "100");
        assert_eq!(text.amount(fields::AMOUNT), None);
    }

    #[test]
    fn empty_description_is_absent() {
        let mut payload = Payload::new();
        payload.insert(fields::DESCRIPTION, "");
        assert_eq!(payload.optional_text(fields::DESCRIPTION), None);

        payload.insert(fields::DESCRIPTION, "lunch");
        assert_eq!(
            payload.optional_text(fields::DESCRIPTION).as_deref(),
            Some("lunch")
        );
    }

    #[test]
    fn timestamp_accepts_all_documented_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 7, 1, 10, 30, 0).unwrap();

        for text in [
            "2025-07-01T10:30:00Z",
            "2025-07-01T07:30:00-03:00",
            "2025-07-01T10:30:00.000Z",
            "2025-07-01T10:30:00",
            "2025-07-01 10:30:00",
        ] {
            assert_eq!(parse_timestamp(text), Some(expected), "format: {text}");
        }

        assert_eq!(
            parse_timestamp("2025-07-01"),
            Some(Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("01/07/2025"), None);
    }

    #[test]
    fn timestamp_accepts_structured_value() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut payload = Payload::new();
        payload.insert(fields::DATE, ts);
        assert_eq!(payload.timestamp(fields::DATE), Some(ts));
    }

    #[test]
    fn json_roundtrip_degrades_timestamp_to_text() {
        let ts = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let mut payload = Payload::new();
        payload.insert(fields::DATE, ts);
        payload.insert(fields::AMOUNT, 50_000.0);
        payload.insert(fields::DESCRIPTION, PayloadValue::Null);

        let json = serde_json::to_string(&payload).unwrap();
        let back: Payload = serde_json::from_str(&json).unwrap();

        assert!(matches!(back.raw("Date"), Some(PayloadValue::Text(_))));
        assert_eq!(back.timestamp(fields::DATE), Some(ts));
        assert_eq!(back.amount(fields::AMOUNT), Some(50_000.0));
        assert_eq!(back.raw("description"), Some(&PayloadValue::Null));
    }
}
