//! 行文本的解码策略。
//!
//! 缓冲内始终保存原始字节，只有在切出一整行之后才按 [`TextEncoding`] 解码。
//! 支持的编码集合是封闭的：UTF-8、ASCII 与 Latin-1（ISO-8859-1）。

use core::fmt;
use core::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::error::LineReaderError;

/// 行解码使用的文本编码。
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(try_from = "String")]
pub enum TextEncoding {
    /// UTF-8，默认编码。
    #[default]
    Utf8,
    /// 7 位 ASCII，任何 `>= 0x80` 的字节都视为非法。
    Ascii,
    /// ISO-8859-1，每个字节直接映射为同值码点，永不失败。
    Latin1,
}

/// 解码失败的细节。
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DecodeError {
    /// 字节序列不是合法 UTF-8。
    #[error("invalid utf-8 sequence after {valid_up_to} valid bytes")]
    InvalidUtf8 {
        /// 出错前合法前缀的长度。
        valid_up_to: usize,
    },
    /// 出现了 ASCII 范围外的字节。
    #[error("non-ascii byte 0x{byte:02x} at offset {offset}")]
    NonAscii {
        /// 非法字节在行内的偏移。
        offset: usize,
        /// 非法字节本身。
        byte: u8,
    },
}

impl TextEncoding {
    /// 规范名称。
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin1",
        }
    }

    /// 将一行原始字节解码为字符串。
    pub fn decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            TextEncoding::Utf8 => core::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|err| DecodeError::InvalidUtf8 {
                    valid_up_to: err.valid_up_to(),
                }),
            TextEncoding::Ascii => match bytes.iter().position(|byte| !byte.is_ascii()) {
                Some(offset) => Err(DecodeError::NonAscii {
                    offset,
                    byte: bytes[offset],
                }),
                // 全部是 ASCII，必然也是合法 UTF-8。
                None => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
            },
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = LineReaderError;

    /// 名称大小写不敏感，接受常见别名。
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            _ => Err(LineReaderError::UnknownEncoding {
                label: label.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = LineReaderError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        label.parse()
    }
}
