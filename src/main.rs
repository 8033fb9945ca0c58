use anyhow::{Context, Result};
use log::{debug, error, info};
use pollster::FutureExt as _;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyboardInput, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

mod app;
mod config;
mod controls;
mod entity;
mod frame_loop;
mod model;
mod renderer;
mod starfield;
mod texture;
mod window;

use app::{App, AppEvent};
use config::Settings;
use model::ModelLoader;

fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::default();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("model-loader")
        .build()
        .context("Failed to build async runtime")?;

    let event_loop = EventLoop::<AppEvent>::with_user_event();

    let window = WindowBuilder::new()
        .with_title(settings.window.title.as_str())
        .with_inner_size(LogicalSize::<u32> {
            width: settings.window.width,
            height: settings.window.height,
        })
        .build(&event_loop)
        .context("Failed to build window")?;

    let mut app = App::new(window, settings).block_on()?;

    let loader = ModelLoader::new(runtime.handle().clone());
    app.load_model(&loader, event_loop.create_proxy());

    app.start();
    info!("Starting frame loop");

    event_loop.run(move |e, _, control_flow| {
        // The runtime lives as long as the event loop.
        let _ = &runtime;

        match e {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => app.stop(),
                WindowEvent::Resized(size) => app.on_resize(size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    app.on_resize(*new_inner_size)
                }
                WindowEvent::MouseInput { state, button, .. } => app.on_mouse_input(state, button),
                WindowEvent::CursorMoved { position, .. } => app.on_cursor_moved(position),
                WindowEvent::MouseWheel { delta, .. } => app.on_mouse_scroll(delta),
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Released,
                            virtual_keycode: Some(keycode),
                            ..
                        },
                    ..
                } => app.on_key_up(keycode),
                _ => (),
            },
            Event::UserEvent(AppEvent::ModelLoaded(result)) => {
                debug!("Model load finished");
                app.on_model_loaded(result);
            }
            Event::RedrawRequested(..) => {
                if let Err(e) = app.render() {
                    error!("Render error: {:?}, exiting", e);
                    app.stop();
                }
            }
            _ => (),
        }

        *control_flow = if app.is_running() {
            ControlFlow::Wait
        } else {
            ControlFlow::Exit
        };
    });
}
