//! 读取器配置。
//!
//! 所有尺寸字段以 `0` 表示“使用默认值”，归一化在访问器中完成；
//! 这样无论配置来自构造器还是宿主的 TOML/JSON 文件，语义都一致。

use serde::Deserialize;

use crate::encoding::TextEncoding;

/// 默认缓冲容量（字节）。
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;
/// 默认单次物理读取的块大小（字节）。
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// 行读取器配置。
///
/// # 教案式说明
/// - **契约 (What)**：
///   - `buffer_size`：初始容量请求，实际容量向上取整到 2 的幂；
///   - `chunk_size`：每次物理读取请求的字节数；
///   - `encoding`：行解码使用的编码，反序列化时按名称解析（如 `"utf-8"`）。
/// - **执行 (How)**：通过 `with_*` 链式构造；`Deserialize` 缺省字段取默认值。
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    buffer_size: usize,
    chunk_size: usize,
    encoding: TextEncoding,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            encoding: TextEncoding::Utf8,
        }
    }
}

impl ReaderConfig {
    /// 使用默认值创建配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置缓冲容量请求；`0` 回退到 [`DEFAULT_BUFFER_SIZE`]。
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// 设置块大小；`0` 回退到 [`DEFAULT_CHUNK_SIZE`]。
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// 设置行解码编码。
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// 生效的缓冲容量请求。
    pub fn buffer_size(&self) -> usize {
        non_zero_or(self.buffer_size, DEFAULT_BUFFER_SIZE)
    }

    /// 生效的块大小。
    pub fn chunk_size(&self) -> usize {
        non_zero_or(self.chunk_size, DEFAULT_CHUNK_SIZE)
    }

    /// 行解码使用的编码。
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// 返回字段均已归一化的副本。
    pub fn normalized(&self) -> Self {
        Self {
            buffer_size: self.buffer_size(),
            chunk_size: self.chunk_size(),
            encoding: self.encoding,
        }
    }
}

fn non_zero_or(value: usize, default: usize) -> usize {
    if value == 0 { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_fall_back_to_defaults() {
        let config = ReaderConfig::new().with_buffer_size(0).with_chunk_size(0);
        assert_eq!(config.buffer_size(), DEFAULT_BUFFER_SIZE);
        assert_eq!(config.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(config.normalized(), ReaderConfig::default());
    }

    #[test]
    fn deserializes_partial_toml() {
        let config: ReaderConfig = toml::from_str(
            r#"
            chunk_size = 512
            encoding = "Latin-1"
            "#,
        )
        .expect("解析配置失败");
        assert_eq!(config.buffer_size(), DEFAULT_BUFFER_SIZE);
        assert_eq!(config.chunk_size(), 512);
        assert_eq!(config.encoding(), TextEncoding::Latin1);
    }

    #[test]
    fn unknown_encoding_is_a_config_error() {
        let err = toml::from_str::<ReaderConfig>(r#"encoding = "ebcdic""#)
            .expect_err("未知编码应导致反序列化失败");
        assert!(err.to_string().contains("ebcdic"));
    }
}
