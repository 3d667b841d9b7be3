#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for flotilla adapters.
//!
//! Renderers never read the world directly. They capture a [`Scene`] from
//! the query snapshots after a tick and draw its sprites.

use flotilla_core::{BaseId, Coord, Fixed, ObjectId, MAX_ADMIRALS};
use flotilla_world::{query, World};
use glam::Vec2;
use std::{error::Error, fmt};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Colors for neutral objects and each admiral's tint index.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    neutral: Color,
    admirals: [Color; MAX_ADMIRALS],
}

impl Palette {
    /// Creates a palette.
    #[must_use]
    pub const fn new(neutral: Color, admirals: [Color; MAX_ADMIRALS]) -> Self {
        Self { neutral, admirals }
    }

    /// Color of a snapshot tint; zero is neutral.
    #[must_use]
    pub fn tint(&self, tint: u8) -> Color {
        usize::from(tint)
            .checked_sub(1)
            .and_then(|index| self.admirals.get(index))
            .copied()
            .unwrap_or(self.neutral)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(
            Color::from_rgb_u8(160, 160, 160),
            [
                Color::from_rgb_u8(220, 60, 50),
                Color::from_rgb_u8(60, 110, 220),
                Color::from_rgb_u8(70, 190, 90),
                Color::from_rgb_u8(230, 200, 60),
            ],
        )
    }
}

/// Window onto the universe, in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    center: Coord,
    units_per_pixel: u32,
    size: Vec2,
}

impl Viewport {
    /// Creates a viewport centred on `center` that is `size` pixels large.
    pub fn new(center: Coord, units_per_pixel: u32, size: Vec2) -> Result<Self, RenderingError> {
        if units_per_pixel == 0 {
            return Err(RenderingError::InvalidScale { units_per_pixel });
        }
        Ok(Self {
            center,
            units_per_pixel,
            size,
        })
    }

    /// World units covered by one pixel.
    #[must_use]
    pub const fn units_per_pixel(&self) -> u32 {
        self.units_per_pixel
    }

    /// Size in pixels.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Screen position of a universe location; the origin is the top-left corner.
    #[must_use]
    pub fn project(&self, at: Coord) -> Vec2 {
        let delta = self.center.delta_to(at);
        let scale = self.units_per_pixel as f32;
        Vec2::new(delta.h as f32 / scale, delta.v as f32 / scale) + self.size * 0.5
    }

    /// Reports whether a projected point lies on screen.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(Vec2::ZERO).all() && point.cmplt(self.size).all()
    }
}

/// One object as a renderer draws it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    /// Object drawn.
    pub object: ObjectId,
    /// Template, for picking the sprite sheet.
    pub base: BaseId,
    /// Screen position of the object's centre.
    pub position: Vec2,
    /// Unit vector of the heading, in screen space.
    pub heading: Vec2,
    /// Frame out of the template's shapes.
    pub shape: u16,
    /// Owner color.
    pub tint: Color,
    /// Display scale, 1.0 being natural size.
    pub scale: f32,
    /// Health bar fill in the range 0.0..=1.0.
    pub health: f32,
    /// Energy bar fill in the range 0.0..=1.0.
    pub energy: f32,
    /// Drawn faded when hidden from the player.
    pub hidden: bool,
}

/// Everything visible through a viewport after one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Game time the scene was captured at.
    pub time: i64,
    /// Window the sprites were projected through.
    pub viewport: Viewport,
    /// Visible objects in creation order.
    pub sprites: Vec<Sprite>,
}

impl Scene {
    /// Projects every in-use object of the world onto the viewport.
    #[must_use]
    pub fn capture(world: &World, viewport: Viewport, palette: &Palette) -> Self {
        let sprites = query::objects(world)
            .into_iter()
            .filter_map(|snapshot| {
                let position = viewport.project(snapshot.location);
                viewport.contains(position).then(|| Sprite {
                    object: snapshot.id,
                    base: snapshot.base,
                    position,
                    heading: heading(snapshot.direction),
                    shape: snapshot.shape,
                    tint: if snapshot.hidden {
                        palette.tint(snapshot.tint).lighten(0.6)
                    } else {
                        palette.tint(snapshot.tint)
                    },
                    scale: fraction(snapshot.scale),
                    health: fraction(snapshot.health).clamp(0.0, 1.0),
                    energy: fraction(snapshot.energy).clamp(0.0, 1.0),
                    hidden: snapshot.hidden,
                })
            })
            .collect();
        Self {
            time: query::time(world),
            viewport,
            sprites,
        }
    }

    /// Sprites drawn in a given color.
    pub fn tinted(&self, tint: Color) -> impl Iterator<Item = &Sprite> {
        self.sprites.iter().filter(move |sprite| sprite.tint == tint)
    }
}

/// Screen-space heading for a direction in degrees, zero pointing up.
fn heading(direction: i32) -> Vec2 {
    let radians = (direction as f32).to_radians();
    Vec2::new(radians.sin(), -radians.cos())
}

fn fraction(value: Fixed) -> f32 {
    value.raw() as f32 / Fixed::ONE.raw() as f32
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// A viewport must cover at least one world unit per pixel.
    InvalidScale {
        /// Provided scale that failed validation.
        units_per_pixel: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScale { units_per_pixel } => {
                write!(
                    f,
                    "units_per_pixel must be positive (received {units_per_pixel})"
                )
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{AdmiralSetup, BaseObject, LevelBuilder};
    use flotilla_world::{Config, SpawnRequest};

    #[test]
    fn viewport_rejects_zero_scale_without_panicking() {
        let error = Viewport::new(Coord::from_center(0, 0), 0, Vec2::splat(100.0))
            .expect_err("zero scale must be rejected");

        assert_eq!(error, RenderingError::InvalidScale { units_per_pixel: 0 });
    }

    #[test]
    fn viewport_projects_relative_to_its_centre() {
        let viewport = Viewport::new(Coord::from_center(0, 0), 4, Vec2::new(200.0, 100.0))
            .expect("valid viewport");

        assert_eq!(
            viewport.project(Coord::from_center(0, 0)),
            Vec2::new(100.0, 50.0)
        );
        assert_eq!(
            viewport.project(Coord::from_center(-40, 80)),
            Vec2::new(90.0, 70.0)
        );
        assert!(!viewport.contains(viewport.project(Coord::from_center(400, 0))));
    }

    #[test]
    fn palette_falls_back_to_neutral() {
        let palette = Palette::default();

        assert_eq!(palette.tint(0), Color::from_rgb_u8(160, 160, 160));
        assert_eq!(palette.tint(1), Color::from_rgb_u8(220, 60, 50));
        assert_eq!(palette.tint(9), Color::from_rgb_u8(160, 160, 160));
    }

    #[test]
    fn capture_culls_off_screen_objects_and_tints_owners() {
        let mut builder = LevelBuilder::new("scene");
        let red = builder.add_admiral(AdmiralSetup::computer("Red"));
        let mut hull = BaseObject::named("Hull");
        hull.health = 40;
        let hull = builder.add_template(hull);
        let mut world = World::from_level(builder.build(), Config::default()).expect("valid");
        let mut out = Vec::new();
        let near = world
            .spawn(
                SpawnRequest::new(hull, Coord::from_center(100, 0)).owned_by(Some(red)),
                &mut out,
            )
            .expect("room");
        let _far = world
            .spawn(SpawnRequest::new(hull, Coord::from_center(90_000, 0)), &mut out)
            .expect("room");

        let viewport = Viewport::new(Coord::from_center(0, 0), 10, Vec2::new(640.0, 480.0))
            .expect("valid viewport");
        let palette = Palette::default();
        let scene = Scene::capture(&world, viewport, &palette);

        assert_eq!(scene.sprites.len(), 1);
        let sprite = scene.sprites[0];
        assert_eq!(sprite.object, near);
        assert_eq!(sprite.position, Vec2::new(330.0, 240.0));
        assert_eq!(sprite.heading, Vec2::new(0.0, -1.0));
        assert_eq!(sprite.health, 1.0);
        assert_eq!(scene.tinted(palette.tint(1)).count(), 1);
    }
}
