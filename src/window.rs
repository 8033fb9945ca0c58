use crate::config::AspectMode;

pub trait HasSize {
    fn size(&self) -> Size;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self, mode: AspectMode) -> f32 {
        let height = self.height.max(1) as f32;
        match mode {
            AspectMode::HeightOverHeight => height / height,
            AspectMode::WidthOverHeight => self.width as f32 / height,
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Size {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

impl HasSize for winit::window::Window {
    fn size(&self) -> Size {
        self.inner_size().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_over_height_is_always_one() {
        let size = Size::new(800, 600);
        assert_eq!(size.aspect_ratio(AspectMode::HeightOverHeight), 1.0);
        assert_eq!(Size::new(1920, 300).aspect_ratio(AspectMode::HeightOverHeight), 1.0);
    }

    #[test]
    fn width_over_height_follows_viewport() {
        let ratio = Size::new(800, 600).aspect_ratio(AspectMode::WidthOverHeight);
        assert!((ratio - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_height_does_not_divide_by_zero() {
        let ratio = Size::new(800, 0).aspect_ratio(AspectMode::WidthOverHeight);
        assert!(ratio.is_finite());
    }
}
