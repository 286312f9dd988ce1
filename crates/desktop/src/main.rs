mod app;
mod settings;
mod theme;
mod workers;

use app::App;

fn main() -> iced::Result {
    env_logger::init();

    iced::application(App::new, App::update, App::view)
        .title("Perception Viewer")
        .theme(App::theme)
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: app::INITIAL_WINDOW,
            min_size: Some(iced::Size::new(480.0, 320.0)),
            // Closing goes through Message::Quit so the camera is released first.
            exit_on_close_request: false,
            ..Default::default()
        })
        .run()
}
