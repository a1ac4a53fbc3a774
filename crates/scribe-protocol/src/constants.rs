//! 硬件相关常量定义
//!
//! 集中定义所有硬件相关的常量，避免在代码中散落"魔法数"。

/// 机械臂自由度（关节数）
pub const NUM_DOF: usize = 6;

/// 设备上的编码器通道数（6 个关节 + 1 个扩展通道）
pub const NUM_ENCODERS: usize = 7;

/// 设备上的模拟量通道数
pub const NUM_ANALOGS: usize = 8;

/// 标定参数块长度（字节）
///
/// 18 个 16 位定点数：6 个 ALPHA、6 个 A、6 个 D。
pub const CALIBRATION_BLOCK_LEN: usize = 36;

/// 目前唯一支持的参数块格式标签
pub const PARAM_FORMAT_DH0_5: &str = "Format DH0.5";

/// 设备注释字符串中出现此标记时，设备额外提供 BETA 参数块
pub const BETA_COMMENT_MARKER: &str = "Beta";

/// 每英寸对应的毫米数
pub const MM_PER_INCH: f64 = 25.4;

/// 标准球形测针相对标准尖头测针的额外长度（英寸）
pub const BALL_TIP_OFFSET_INCHES: f64 = 0.242;

/// 16 位定点角度的满量程（对应 π 弧度）
pub const ANGLE_FIXED_POINT_SCALE: f64 = 32768.0;

/// 16 位定点长度的缩放（千分之一英寸）
pub const LENGTH_FIXED_POINT_SCALE: f64 = 1000.0;

/// 右踏板按下
pub const RIGHT_PEDAL: u8 = 1;
/// 左踏板按下
pub const LEFT_PEDAL: u8 = 2;
/// 两个踏板同时按下
pub const BOTH_PEDALS: u8 = 3;

/// 关节索引：底座
pub const BASE: usize = 0;
/// 关节索引：肩部
pub const SHOULDER: usize = 1;
/// 关节索引：肘部（带 BETA 扭转的非标准关节）
pub const ELBOW: usize = 2;
/// 关节索引：前臂
pub const FOREARM: usize = 3;
/// 关节索引：腕部
pub const WRIST: usize = 4;
/// 关节索引：测针
pub const STYLUS: usize = 5;
