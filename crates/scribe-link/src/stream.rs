//! 字节流能力
//!
//! 链路层实现所消费的最小串口能力。每个平台各自提供实现；
//! 这里只给出一个内存实现，供模拟设备和测试使用。

use std::collections::VecDeque;

/// 串口字节流
pub trait ByteStream {
    /// 读取一个字节，缓冲区为空时返回 `None`
    fn read(&mut self) -> Option<u8>;
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;
    /// 接收缓冲区中待读取的字节数
    fn bytes_available(&self) -> usize;
    /// 丢弃接收缓冲区中的全部数据
    fn flush(&mut self);
}

/// 基于内存队列的字节流
#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟设备发来的数据
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// 主机已写出的全部数据
    pub fn written(&self) -> &[u8] {
        &self.tx
    }
}

impl ByteStream for MemoryStream {
    fn read(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.tx.extend_from_slice(bytes);
        Ok(())
    }

    fn bytes_available(&self) -> usize {
        self.rx.len()
    }

    fn flush(&mut self) {
        self.rx.clear();
    }
}
