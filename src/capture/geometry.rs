//! 截图几何基础类型
//!
//! 坐标约定：
//! - **全局坐标**：整个虚拟桌面，左下角原点，Y 轴向上
//! - **覆盖层本地坐标**：单块显示器内，同样左下角原点，原点为该显示器 `frame` 的左下角
//! - **采集坐标**：单块显示器内，左上角原点，由 `mapper` 负责换算

use serde::Serialize;

/// 显示器标识（由显示器枚举原语提供）
pub type DisplayId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 以两个角点构造轴对齐矩形（拖拽选区）
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// 把点收敛到矩形范围内（含边界）
    pub fn clamp_point(&self, point: Point) -> Point {
        Point {
            x: point.x.clamp(self.x, self.max_x()),
            y: point.y.clamp(self.y, self.max_y()),
        }
    }

    /// 判断点是否落在矩形内，采用左闭右开区间，相邻显示器交界处不重复命中
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }
}

/// 一块已连接的显示器
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Display {
    pub id: DisplayId,
    /// 全局坐标系中的逻辑区域
    pub frame: Rect,
    /// 逻辑像素到物理像素的比例（高分屏通常为 2.0）
    pub scale_factor: f64,
}

impl Display {
    /// 覆盖层本地坐标下的完整区域
    pub fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.frame.width, self.frame.height)
    }
}

/// 在显示器列表中查找包含全局坐标点的显示器
pub fn find_display_at(point: Point, displays: &[Display]) -> Option<&Display> {
    displays.iter().find(|display| display.frame.contains(point))
}
