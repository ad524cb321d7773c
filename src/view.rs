//! Mutable per-view state shared by input handling and rendering.

use crate::rotation::RotationState;

/// RGBA color with components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    /// Tint of the lit mesh, half transparent so the background shows through.
    pub const MESH_GREEN: Color = Color::rgba(0.39, 1.0, 0.0, 0.5);

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    /// Parses `r,g,b` or `r,g,b,a` with float components.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid color '{s}': {e}"))?;

        match parts.as_slice() {
            [r, g, b] => Ok(Color::rgb(*r, *g, *b)),
            [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
            _ => Err(format!("invalid color '{s}': expected 3 or 4 components")),
        }
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

/// Everything the renderer reads that input can change.
///
/// Any mutation that alters what would be drawn marks the view dirty; the host
/// drains the flag with [`take_dirty`](ViewState::take_dirty) and schedules a redraw.
#[derive(Clone, Debug)]
pub struct ViewState {
    rotation: RotationState,
    clear_color: Color,
    dirty: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            rotation: RotationState::new(),
            clear_color: Color::BLACK,
            dirty: false,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_x_rotation(&mut self, angle: i32) {
        if self.rotation.set_x_rotation(angle) {
            self.dirty = true;
        }
    }

    pub fn set_y_rotation(&mut self, angle: i32) {
        if self.rotation.set_y_rotation(angle) {
            self.dirty = true;
        }
    }

    pub fn set_z_rotation(&mut self, angle: i32) {
        if self.rotation.set_z_rotation(angle) {
            self.dirty = true;
        }
    }

    /// Adds raw deltas and always requests a redraw, even for zero deltas.
    pub fn rotate_by(&mut self, dx: i32, dy: i32, dz: i32) {
        self.rotation.rotate_by(dx, dy, dz);
        self.dirty = true;
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
        self.dirty = true;
    }

    /// Forces a redraw on the next drain, e.g. after a resize.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the dirty flag and clears it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
