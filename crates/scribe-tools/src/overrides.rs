//! # 测针覆盖值文件
//!
//! 纯文本，每行一个 `Name = value`（或 `Name value`），单位为英寸：
//!
//! ```text
//! D5Delta = 0.125
//! D4Delta 0.01
//! A5Delta = -0.003
//! ```
//!
//! 未知的键被忽略。数值取开头的数字部分（`0.125in` 读作 0.125），
//! 开头没有数字时按 0.0 处理。文件不存在等同于没有覆盖值。

use scribe_protocol::{TipOverrideSource, TipOverrides};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// 设备 SDK 约定的默认文件名
pub const DEFAULT_FILE_NAME: &str = "MSTIP.DAT";

const KNOWN_KEYS: [&str; 3] = [
    TipOverrides::STYLUS_LENGTH_KEY,
    TipOverrides::PENULTIMATE_LINK_KEY,
    TipOverrides::FINAL_LINK_OFFSET_KEY,
];

/// 解析后的覆盖值文件
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TipOverrideFile {
    values: HashMap<String, f64>,
}

impl TipOverrideFile {
    /// 解析文件内容
    ///
    /// 同一个键出现多次时以最后一次为准。
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            let mut parts = line
                .split(|c: char| c == '=' || c.is_whitespace())
                .filter(|part| !part.is_empty());
            let Some(name) = parts.next() else {
                continue;
            };
            if !KNOWN_KEYS.contains(&name) {
                continue;
            }
            let value = parts.next().map(leading_number).unwrap_or(0.0);
            values.insert(name.to_string(), value);
        }
        Self { values }
    }

    /// 读取文件；文件不存在时返回空的覆盖值
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 转换为三个覆盖值
    pub fn overrides(&self) -> TipOverrides {
        TipOverrides::from_source(self)
    }
}

/// 取最长的十进制数前缀，与设备 SDK 读取该文件时的规则一致
fn leading_number(raw: &str) -> f64 {
    let bytes = raw.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    raw[..end].parse().unwrap_or(0.0)
}

impl TipOverrideSource for TipOverrideFile {
    fn lookup(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_separators() {
        let file = TipOverrideFile::parse("D5Delta = 0.125\nD4Delta 0.01\nA5Delta=-0.003\n");
        let overrides = file.overrides();
        assert_eq!(overrides.stylus_length, 0.125);
        assert_eq!(overrides.penultimate_link, 0.01);
        assert_eq!(overrides.final_link_offset, -0.003);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let file = TipOverrideFile::parse("Foo = 3\n\n   \nD5Delta = 1\n");
        assert_eq!(file.lookup("Foo"), None);
        assert_eq!(file.lookup("D5Delta"), Some(1.0));
    }

    #[test]
    fn test_bad_number_reads_zero() {
        let file = TipOverrideFile::parse("D5Delta = abc\nD4Delta\n");
        assert_eq!(file.lookup("D5Delta"), Some(0.0));
        assert_eq!(file.lookup("D4Delta"), Some(0.0));
        assert!(file.overrides().is_zero());
    }

    #[test]
    fn test_value_with_trailing_text() {
        let file = TipOverrideFile::parse("D5Delta = 0.125mm\nD4Delta -2.5e-1;\nA5Delta = .5x\n");
        let overrides = file.overrides();
        assert_eq!(overrides.stylus_length, 0.125);
        assert_eq!(overrides.penultimate_link, -0.25);
        assert_eq!(overrides.final_link_offset, 0.5);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("3"), 3.0);
        assert_eq!(leading_number("+1.5e"), 1.5);
        assert_eq!(leading_number("2.e3in"), 2000.0);
        assert_eq!(leading_number("7E+1"), 70.0);
        assert_eq!(leading_number("-"), 0.0);
        assert_eq!(leading_number(".x"), 0.0);
        assert_eq!(leading_number("in0.5"), 0.0);
    }

    #[test]
    fn test_missing_file_means_no_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let file = TipOverrideFile::load(dir.path().join(DEFAULT_FILE_NAME)).unwrap();
        assert!(file.is_empty());
        assert!(file.overrides().is_zero());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE_NAME);
        fs::write(&path, "A5Delta = 0.5\r\nA5Delta = 0.75\r\n").unwrap();
        let file = TipOverrideFile::load(&path).unwrap();
        assert_eq!(file.overrides().final_link_offset, 0.75);
    }
}
