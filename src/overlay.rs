//! Flat 2D drawing into the framebuffer: the editor's top-down view and the
//! in-game minimap.

use glam::{IVec2, Vec2};

use crate::camera::Camera;
use crate::world::{Wall, World};

/// Screen-space clip rectangle, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn screen(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            w: width as i32,
            h: height as i32,
        }
    }

    #[inline]
    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }
}

/// World-to-screen mapping for a top-down view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub origin: Vec2, // world point shown at `offset`
    pub scale: f32,   // pixels per world unit
    pub offset: Vec2, // screen position of `origin`
}

impl View {
    #[inline]
    pub fn to_screen(&self, p: Vec2) -> IVec2 {
        ((p - self.origin) * self.scale + self.offset).as_ivec2()
    }

    #[inline]
    pub fn to_world(&self, px: Vec2) -> Vec2 {
        (px - self.offset) / self.scale + self.origin
    }
}

pub struct Palette;

impl Palette {
    pub const BACKGROUND: u32 = 0x14_1414; // (20, 20, 20)
    pub const GRID: u32 = 0x32_3232; // (50, 50, 50)
    pub const WALL: u32 = 0xFF_FFFF;
    pub const PORTAL: u32 = 0x00_80FF; // (0, 128, 255)
    pub const PENDING: u32 = 0xFF_A000; // (255, 160, 0)
    pub const HOVER: u32 = 0xFF_FF00;
    pub const DRAFT: u32 = 0x00_FF00;
    pub const MINIMAP_BG: u32 = 0x1E_1E1E; // (30, 30, 30)
    pub const MINIMAP_PORTAL: u32 = 0x00_FFFF;
    pub const PLAYER: u32 = 0xFF_0000;
}

#[inline]
fn plot(buf: &mut [u32], width: usize, clip: Rect, p: IVec2, color: u32) {
    if clip.contains(p) {
        buf[p.y as usize * width + p.x as usize] = color;
    }
}

/// Liang-Barsky clip of `a`-`b` against `clip`, in f64 so saturated
/// coordinates stay usable.
fn clip_segment(clip: Rect, a: IVec2, b: IVec2) -> Option<(IVec2, IVec2)> {
    if clip.w <= 0 || clip.h <= 0 {
        return None;
    }
    let (x0, y0) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - x0, b.y as f64 - y0);
    let (xmin, xmax) = (clip.x as f64, (clip.x + clip.w - 1) as f64);
    let (ymin, ymax) = (clip.y as f64, (clip.y + clip.h - 1) as f64);

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, x0 - xmin),
        (dx, xmax - x0),
        (-dy, y0 - ymin),
        (dy, ymax - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    let at = |t: f64| {
        let x = (x0 + dx * t).round().clamp(xmin, xmax) as i32;
        let y = (y0 + dy * t).round().clamp(ymin, ymax) as i32;
        IVec2::new(x, y)
    };
    Some((at(t0), at(t1)))
}

/// Bresenham line, clipped to `clip` before stepping.
pub fn draw_line(buf: &mut [u32], width: usize, clip: Rect, a: IVec2, b: IVec2, color: u32) {
    let Some((a, b)) = clip_segment(clip, a, b) else {
        return;
    };
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut p = a;

    loop {
        plot(buf, width, clip, p, color);
        if p == b {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            p.x += sx;
        }
        if e2 <= dx {
            err += dx;
            p.y += sy;
        }
    }
}

pub fn fill_rect(buf: &mut [u32], width: usize, clip: Rect, rect: Rect, color: u32) {
    for y in rect.y..rect.y + rect.h {
        for x in rect.x..rect.x + rect.w {
            plot(buf, width, clip, IVec2::new(x, y), color);
        }
    }
}

pub fn fill_disc(
    buf: &mut [u32],
    width: usize,
    clip: Rect,
    centre: IVec2,
    radius: i32,
    color: u32,
) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                plot(buf, width, clip, centre + IVec2::new(dx, dy), color);
            }
        }
    }
}

/// Grid lines every `step` world units across the clip rectangle.
pub fn draw_grid(buf: &mut [u32], width: usize, clip: Rect, view: &View, step: f32, color: u32) {
    let px_step = step * view.scale;
    if px_step < 2.0 {
        return;
    }

    let top_left = view.to_world(Vec2::new(clip.x as f32, clip.y as f32));
    let first = (top_left / step).floor() * step;

    let mut x = first.x;
    loop {
        let sx = view.to_screen(Vec2::new(x, first.y)).x;
        if sx >= clip.x + clip.w {
            break;
        }
        let top = IVec2::new(sx, clip.y);
        draw_line(buf, width, clip, top, IVec2::new(sx, clip.y + clip.h - 1), color);
        x += step;
    }

    let mut y = first.y;
    loop {
        let sy = view.to_screen(Vec2::new(first.x, y)).y;
        if sy >= clip.y + clip.h {
            break;
        }
        let left = IVec2::new(clip.x, sy);
        draw_line(buf, width, clip, left, IVec2::new(clip.x + clip.w - 1, sy), color);
        y += step;
    }
}

fn wall_color(wall: &Wall, portal: u32) -> u32 {
    match (wall.is_portal, wall.adjoining) {
        (false, _) => Palette::WALL,
        (true, Some(_)) => portal,
        (true, None) => Palette::PENDING,
    }
}

/// Every wall of every sector, portals tinted.
pub fn draw_world(
    buf: &mut [u32],
    width: usize,
    clip: Rect,
    view: &View,
    world: &World,
    portal: u32,
) {
    for (_, wall) in world.walls() {
        let a = view.to_screen(wall.start);
        let b = view.to_screen(wall.end);
        draw_line(buf, width, clip, a, b, wall_color(wall, portal));
    }
}

const MINIMAP_SIZE: i32 = 150;
const MINIMAP_MARGIN: i32 = 10;
const MINIMAP_SCALE: f32 = 5.0;

/// Top-left minimap with walls, the player and its view direction.
pub fn draw_minimap(buf: &mut [u32], width: usize, height: usize, world: &World, camera: &Camera) {
    let clip = Rect {
        x: MINIMAP_MARGIN,
        y: MINIMAP_MARGIN,
        w: MINIMAP_SIZE,
        h: MINIMAP_SIZE,
    };
    let screen = Rect::screen(width, height);
    fill_rect(buf, width, screen, clip, Palette::MINIMAP_BG);

    // Clip to both the minimap box and the framebuffer
    let clip = Rect {
        w: clip.w.min(screen.w - clip.x),
        h: clip.h.min(screen.h - clip.y),
        ..clip
    };
    let view = View {
        origin: Vec2::ZERO,
        scale: MINIMAP_SCALE,
        offset: Vec2::splat(MINIMAP_MARGIN as f32),
    };
    draw_world(buf, width, clip, &view, world, Palette::MINIMAP_PORTAL);

    let player = view.to_screen(camera.pos);
    fill_disc(buf, width, clip, player, 4, Palette::PLAYER);
    let tip = player + (camera.dir * 10.0).as_ivec2();
    draw_line(buf, width, clip, player, tip, Palette::PLAYER);
}
