use std::collections::HashSet;
use std::error::Error;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use glam::Vec2;
use log::{debug, error, info, warn};
use simplelog::TermLogger;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use portalcaster::camera::Camera;
use portalcaster::collision::slide_move;
use portalcaster::editor::{Click, Editor};
use portalcaster::map_file::{MapUnits, load_map};
use portalcaster::overlay::{self, Palette, Rect, View};
use portalcaster::renderer;
use portalcaster::scaler::{ScaleLut, blit_nearest_stretch, build_scale_lut};
use portalcaster::world::World;

use crate::cli::CLIOptions;
use crate::config::UserConfig;

mod cli;
mod config;

const DEFAULT_MAP: &str = "map.txt";
const CEILING_STEP: f32 = 0.5;
const VERTEX_RADIUS: i32 = 2;

type Surface = softbuffer::Surface<Rc<Window>, Rc<Window>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Edit,
    Play,
}

struct App {
    window: Option<Rc<Window>>,
    surface: Option<Surface>,
    world: World,
    camera: Camera,
    editor: Editor,
    config: UserConfig,
    mode: Mode,
    show_minimap: bool,

    // HUD
    frame_counter: u32,
    last_fps_print: Instant,

    // Internal buffer, fixed 480 lines
    fb_small: Vec<u32>,
    fb_w: usize,
    fb_h: usize,

    scale_lut: ScaleLut,

    // Input and movement
    keys_down: HashSet<KeyCode>,
    cursor: Vec2, // framebuffer pixels
    last_tick: Instant,

    init_error: Option<Box<dyn Error>>,
}

impl App {
    fn new(world: World, editor: Editor, config: UserConfig, mode: Mode) -> Self {
        let spawn = spawn_point(&world).unwrap_or(Camera::default().pos);
        let mut camera = Camera::new(spawn, Vec2::NEG_X, 1.0);
        camera.set_fov(config.fov);
        info!("Camera at {spawn}, FOV {:.1} degrees", camera.fov_deg());

        Self {
            window: None,
            surface: None,
            world,
            camera,
            editor,
            config,
            mode,
            show_minimap: false,

            frame_counter: 0,
            last_fps_print: Instant::now(),

            fb_small: vec![0; 640 * 480],
            fb_w: 640,
            fb_h: 480,

            scale_lut: ScaleLut::empty(),

            keys_down: HashSet::new(),
            cursor: Vec2::ZERO,
            last_tick: Instant::now(),

            init_error: None,
        }
    }

    fn init_surface(
        &self,
        event_loop: &ActiveEventLoop,
    ) -> Result<(Rc<Window>, Surface), Box<dyn Error>> {
        let attributes = Window::default_attributes()
            .with_title("portalcaster")
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        let window = Rc::new(event_loop.create_window(attributes)?);
        let context = softbuffer::Context::new(window.clone())?;
        let surface = softbuffer::Surface::new(&context, window.clone())?;
        Ok((window, surface))
    }

    fn view(&self) -> View {
        View {
            origin: Vec2::ZERO,
            scale: self.config.pixels_per_unit,
            offset: Vec2::splat(20.0),
        }
    }

    fn cursor_world(&self) -> Vec2 {
        self.view().to_world(self.cursor)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (window, surface) = match self.init_surface(event_loop) {
            Ok(pair) => pair,
            Err(e) => {
                error!("Window setup failed: {e}");
                self.init_error = Some(e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.rebuild_internal_fb_and_lut(size.width as usize, size.height as usize);

        window.request_redraw();
        self.surface = Some(surface);
        self.window = Some(window);

        self.last_tick = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("The close button was pressed; stopping");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if let PhysicalKey::Code(code) = physical_key {
                    match state {
                        ElementState::Pressed => {
                            self.keys_down.insert(code);
                            if !repeat {
                                self.key_pressed(event_loop, code);
                            }
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&code);
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = self.scale_lut.to_source(position.x as f32, position.y as f32);
                self.cursor = Vec2::new(x, y);
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } if self.mode == Mode::Edit => self.mouse_pressed(button),

            WindowEvent::RedrawRequested => {
                self.tick();
                let view = self.view();

                let (window, surface) = match (&self.window, &mut self.surface) {
                    (Some(w), Some(s)) if w.id() == id => (w, s),
                    _ => return,
                };

                let size = window.inner_size();
                let dw = size.width as usize;
                // Minimized window, skip drawing
                let (Some(nw), Some(nh)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                else {
                    return;
                };

                // Set softbuffer to window size
                if let Err(e) = surface.resize(nw, nh) {
                    error!("Surface resize failed: {e}");
                    return;
                }

                match self.mode {
                    Mode::Play => renderer::render_frame(
                        &mut self.fb_small,
                        self.fb_w,
                        self.fb_h,
                        &self.world,
                        &self.camera,
                    ),
                    Mode::Edit => draw_editor(
                        &mut self.fb_small,
                        self.fb_w,
                        self.fb_h,
                        &self.world,
                        &self.editor,
                        &view,
                        self.cursor,
                    ),
                }
                if self.show_minimap {
                    overlay::draw_minimap(
                        &mut self.fb_small,
                        self.fb_w,
                        self.fb_h,
                        &self.world,
                        &self.camera,
                    );
                }

                let mut buf = match surface.buffer_mut() {
                    Ok(buf) => buf,
                    Err(e) => {
                        error!("Could not lock surface buffer: {e}");
                        return;
                    }
                };
                blit_nearest_stretch(&mut buf, dw, &self.fb_small, self.fb_w, &self.scale_lut);
                if let Err(e) = buf.present() {
                    error!("Present failed: {e}");
                }

                // Print FPS
                self.frame_counter += 1;
                let now = Instant::now();
                if now.duration_since(self.last_fps_print).as_secs_f32() >= 1.0 {
                    let fps = self.frame_counter as f32
                        / now.duration_since(self.last_fps_print).as_secs_f32();
                    debug!("FPS: {:.1}", fps);
                    self.frame_counter = 0;
                    self.last_fps_print = now;
                }

                window.request_redraw();
            }

            WindowEvent::Resized(new_size) => {
                let (dw, dh) = (new_size.width as usize, new_size.height as usize);
                // Update internal window
                self.rebuild_internal_fb_and_lut(dw, dh);
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl App {
    fn key_pressed(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Tab => {
                self.mode = match self.mode {
                    Mode::Edit => Mode::Play,
                    Mode::Play => Mode::Edit,
                };
                info!("Switched to {:?} mode", self.mode);
            }
            KeyCode::KeyM => self.show_minimap = !self.show_minimap,
            _ if self.mode == Mode::Edit => self.edit_key(code),
            _ => {}
        }
    }

    fn edit_key(&mut self, code: KeyCode) {
        let p = self.cursor_world();
        match code {
            KeyCode::Enter | KeyCode::NumpadEnter => {
                self.editor.finish(&mut self.world);
            }
            KeyCode::KeyD => {
                if self.editor.delete_at(&mut self.world, p).is_none() {
                    warn!("No sector under the cursor to delete");
                }
            }
            KeyCode::KeyS => {
                if let Err(e) = self.editor.save(&self.world) {
                    error!("Save failed: {e}");
                }
            }
            KeyCode::Backspace => {
                self.editor.undo_vertex();
            }
            KeyCode::PageUp => {
                self.editor.adjust_ceiling_at(&mut self.world, p, CEILING_STEP);
            }
            KeyCode::PageDown => {
                self.editor.adjust_ceiling_at(&mut self.world, p, -CEILING_STEP);
            }
            _ => {}
        }
    }

    fn mouse_pressed(&mut self, button: MouseButton) {
        let p = self.cursor_world();
        match button {
            MouseButton::Left => {
                if let Click::Rejected = self.editor.left_click(&mut self.world, p) {
                    warn!("Polygon could not be closed");
                }
            }
            MouseButton::Right => {
                if let Some(result) = self.editor.toggle_portal_at(&mut self.world, p) {
                    debug!("Portal toggle: {result:?}");
                }
            }
            _ => {}
        }
    }

    fn tick(&mut self) {
        // Compute dt with cap to avoid huge jumps if the app was paused
        let now = Instant::now();
        let mut dt = now.duration_since(self.last_tick);
        self.last_tick = now;
        if dt > Duration::from_millis(100) {
            dt = Duration::from_millis(100);
        }
        let dt_s = dt.as_secs_f32();

        if self.mode != Mode::Play {
            return;
        }

        let axis = |neg: KeyCode, pos: KeyCode| -> f32 {
            self.keys_down.contains(&pos) as i32 as f32 - self.keys_down.contains(&neg) as i32 as f32
        };
        let fwd = axis(KeyCode::KeyS, KeyCode::KeyW);
        let strafe = axis(KeyCode::KeyQ, KeyCode::KeyE);
        // A turns left (counter-clockwise)
        let turn = axis(KeyCode::KeyD, KeyCode::KeyA);

        if turn != 0.0 {
            self.camera.rotate(turn * self.config.turn_speed * dt_s);
        }

        let wish = self.camera.dir * fwd + self.camera.right() * strafe;
        if wish != Vec2::ZERO {
            let delta = wish.normalize() * self.config.move_speed * dt_s;
            self.camera.pos = slide_move(
                &self.world,
                self.camera.pos,
                delta,
                self.config.collision_radius,
            );
        }
    }

    fn rebuild_internal_fb_and_lut(&mut self, dst_w: usize, dst_h: usize) {
        // Keep internal height fixed (controls pixel size look)
        let target_h = 480usize;
        let aspect = if dst_h > 0 {
            dst_w as f32 / dst_h as f32
        } else {
            1.0
        };

        // Derive width from aspect
        let mut target_w = (target_h as f32 * aspect).round() as usize;
        if target_w < 160 {
            target_w = 160;
        }
        if target_w % 2 != 0 {
            target_w += 1;
        }

        // Reallocate internal FB if size changed
        if target_w != self.fb_w || target_h != self.fb_h {
            self.fb_w = target_w;
            self.fb_h = target_h;
            self.fb_small = vec![0u32; self.fb_w * self.fb_h];
        }

        self.scale_lut = build_scale_lut(dst_w, dst_h, self.fb_w, self.fb_h);
    }
}

/// Top-down view: grid, sectors, the draft polygon and the wall under the cursor.
fn draw_editor(
    buf: &mut [u32],
    width: usize,
    height: usize,
    world: &World,
    editor: &Editor,
    view: &View,
    cursor: Vec2,
) {
    buf.fill(Palette::BACKGROUND);
    let clip = Rect::screen(width, height);

    overlay::draw_grid(buf, width, clip, view, editor.settings.grid_step, Palette::GRID);
    overlay::draw_world(buf, width, clip, view, world, Palette::PORTAL);

    let cursor_world = view.to_world(cursor);
    if let Some(wall) = world
        .find_nearest_wall(cursor_world, editor.settings.hit_radius)
        .and_then(|r| world.wall(r))
    {
        let (a, b) = (view.to_screen(wall.start), view.to_screen(wall.end));
        overlay::draw_line(buf, width, clip, a, b, Palette::HOVER);
    }

    let points: Vec<_> = editor.vertices.iter().map(|&v| view.to_screen(v)).collect();
    for pair in points.windows(2) {
        overlay::draw_line(buf, width, clip, pair[0], pair[1], Palette::DRAFT);
    }
    if let Some(&last) = points.last() {
        let next = view.to_screen(editor.snap(world, cursor_world));
        overlay::draw_line(buf, width, clip, last, next, Palette::DRAFT);
    }
    for &p in &points {
        overlay::fill_disc(buf, width, clip, p, VERTEX_RADIUS, Palette::DRAFT);
    }
}

/// Mean of the first sector's vertices.
fn spawn_point(world: &World) -> Option<Vec2> {
    let sector = world.sectors.first()?;
    let sum: Vec2 = sector.walls.iter().map(|w| w.start).sum();
    Some(sum / sector.walls.len().max(1) as f32)
}

/// World, save target and save encoding for this run.
fn startup_world(options: &CLIOptions, config: &UserConfig) -> (World, PathBuf, MapUnits) {
    let configured = config.map_units();
    let Some(path) = options.map.clone() else {
        return (World::new(), PathBuf::from(DEFAULT_MAP), configured);
    };

    match load_map(&path) {
        // A file keeps its own encoding unless the CLI asks otherwise
        Ok((world, units)) => {
            let units = if options.units.is_some() { configured } else { units };
            (world, path, units)
        }
        Err(e) => {
            error!("{e}, starting with an empty world");
            (World::new(), path, configured)
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let options: CLIOptions = argh::from_env();

    TermLogger::init(
        options.verbose.unwrap_or(log::LevelFilter::Info),
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut user_config = UserConfig::load();
    user_config.sync_cli(&options);

    let (world, filename, units) = startup_world(&options, &user_config);
    let editor = Editor::new(user_config.editor_settings(), filename, units);
    let mode = if options.edit { Mode::Edit } else { Mode::Play };

    let event_loop = EventLoop::new()?;
    // Frames are driven by request_redraw in about_to_wait
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(world, editor, user_config, mode);
    event_loop.run_app(&mut app)?;

    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
