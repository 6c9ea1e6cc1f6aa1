use std::num::NonZeroU32;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

pub mod render;
pub mod state;

use state::ViewerState;

// ---------------------------------------------------------------------------
// Window shell: winit event loop + softbuffer surface
// ---------------------------------------------------------------------------

pub struct App {
    pub state: ViewerState,
    window: Option<Arc<Window>>,
    // kept alive for the lifetime of the surface
    _context: Option<softbuffer::Context<Arc<Window>>>,
    surface: Option<softbuffer::Surface<Arc<Window>, Arc<Window>>>,
}

impl App {
    pub fn new(state: ViewerState) -> App {
        App {
            state,
            window: None,
            _context: None,
            surface: None,
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop, execute_deletes: bool) {
        self.state.finalize(execute_deletes);
        event_loop.exit();
    }

    fn redraw(&mut self) {
        let (Some(window), Some(surface)) = (self.window.as_ref(), self.surface.as_mut()) else {
            return;
        };
        let size = window.inner_size();
        let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };
        if surface.resize(w, h).is_err() {
            log::error!("surface resize to {}x{} failed", size.width, size.height);
            return;
        }
        match surface.buffer_mut() {
            Ok(mut buffer) => {
                self.state.render(&mut buffer, size.width, size.height);
                if let Err(e) = buffer.present() {
                    log::error!("present failed: {}", e);
                }
            }
            Err(e) => log::error!("could not acquire framebuffer: {}", e),
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: &Key) {
        if let Some(action) = self.state.keymap.action_for(key) {
            self.state.handle_action(action);
            self.request_redraw();
            return;
        }
        match key {
            Key::Character(s) => match s.to_ascii_lowercase().as_str() {
                "o" => {
                    self.state.pick_source_dir();
                    self.request_redraw();
                }
                "s" => self.state.pick_dest_dir(),
                "x" => self.shutdown(event_loop, true),
                _ => {}
            },
            Key::Named(NamedKey::Escape) => self.shutdown(event_loop, false),
            _ => {}
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("picsel")
            .with_inner_size(LogicalSize::new(
                self.state.settings.window_width,
                self.state.settings.window_height,
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("could not create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let context = match softbuffer::Context::new(window.clone()) {
            Ok(c) => c,
            Err(e) => {
                log::error!("could not create graphics context: {}", e);
                event_loop.exit();
                return;
            }
        };
        let surface = match softbuffer::Surface::new(&context, window.clone()) {
            Ok(s) => s,
            Err(e) => {
                log::error!("could not create surface: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window);
        self._context = Some(context);
        self.surface = Some(surface);
        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop, false),
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    self.state.window_size = (size.width, size.height);
                }
                self.request_redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, &logical_key),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}
