//! Output device seam and per-kind rendering.

use crate::{
    media::{MediaContainer, MediaKind, PixelSurface, Text},
    protocol::Rotation,
};

/// Display hardware driven by the scheduler.
///
/// Only the display context holds the surface, so implementations need not
/// be thread-safe beyond `Send`.
pub trait RenderSurface: Send {
    /// Copy a full decoded frame to the screen.
    fn blit(&mut self, frame: &PixelSurface);

    /// Fill the whole screen with one RGB565 colour.
    fn fill(&mut self, color: u16);

    /// Orient subsequent drawing.
    fn set_rotation(&mut self, rotation: Rotation);

    /// Draw one string.
    fn draw_text(&mut self, text: &Text);

    /// Switch the backlight.
    fn set_backlight(&mut self, on: bool);
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn blit(&mut self, frame: &PixelSurface) { (**self).blit(frame); }

    fn fill(&mut self, color: u16) { (**self).fill(color); }

    fn set_rotation(&mut self, rotation: Rotation) { (**self).set_rotation(rotation); }

    fn draw_text(&mut self, text: &Text) { (**self).draw_text(text); }

    fn set_backlight(&mut self, on: bool) { (**self).set_backlight(on); }
}

/// Draw `media` on `surface`.
pub(crate) fn render(surface: &mut dyn RenderSurface, media: &MediaContainer) {
    match media.kind() {
        MediaKind::Text(text) => surface.draw_text(text),
        MediaKind::TextGroup(group) => {
            surface.fill(group.bg_color);
            surface.set_rotation(group.rotation);
            for member in &group.members {
                surface.draw_text(member);
            }
        }
        MediaKind::Image(image) => {
            surface.set_rotation(image.rotation());
            if image.with_surface(|frame| surface.blit(frame)).is_none() {
                log::warn!("ready image has no decoded surface: id={}", image.id());
            }
        }
    }
}
