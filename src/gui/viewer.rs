use crate::apod::FIRST_APOD_DATE;
use crate::cache::{ApodRecord, CacheReader};
use crate::desktop::set_desktop_background;
use crate::utils::{image_dimensions, scale_to_fit};
use chrono::{Local, NaiveDate};
use iced::{
    keyboard::{key::Named, Key},
    widget::{button, column, container, image, row, scrollable, text, text_input},
    Element, Length, Size, Task, Theme,
};
use std::path::PathBuf;
use tracing::warn;

const MAX_IMAGE_SIZE: (u32, u32) = (800, 600);

pub fn string_to_theme(theme_str: &str) -> Theme {
    Theme::ALL
        .iter()
        .find(|theme| theme.to_string() == theme_str)
        .cloned()
        .unwrap_or(Theme::Dark)
}

#[derive(Debug, Clone)]
pub enum Message {
    DateInputChanged(String),
    DateSubmitted,
    PreviousDay,
    NextDay,
    EntrySelected(NaiveDate),
    SetAsDesktop,
}

struct ShownApod {
    title: String,
    explanation: String,
    file_path: PathBuf,
    display_size: (u32, u32),
}

pub struct ApodViewer {
    cache: CacheReader,
    theme: Theme,
    date_input: String,
    selected: NaiveDate,
    shown: Option<ShownApod>,
    records: Vec<ApodRecord>,
    status: String,
}

impl ApodViewer {
    pub fn new(cache: CacheReader, theme: Theme) -> Self {
        let today = Local::now().date_naive();
        let records = cache.all_records().unwrap_or_else(|e| {
            warn!("Failed to list cached APODs: {}", e);
            Vec::new()
        });
        let start = cache.latest_date().ok().flatten().unwrap_or(today);

        let mut viewer = Self {
            cache,
            theme,
            date_input: String::new(),
            selected: start,
            shown: None,
            records,
            status: String::new(),
        };
        viewer.show_date(start);
        viewer
    }

    fn show_date(&mut self, date: NaiveDate) {
        self.selected = date;
        self.date_input = date.format("%Y-%m-%d").to_string();
        self.shown = None;

        match self.cache.record_for_date(date) {
            Ok(Some(record)) if record.file_path.is_file() => {
                let display_size = image_dimensions(&record.file_path)
                    .map(|size| scale_to_fit(size, MAX_IMAGE_SIZE))
                    .unwrap_or(MAX_IMAGE_SIZE);
                self.status.clear();
                self.shown = Some(ShownApod {
                    title: record.title,
                    explanation: record.explanation,
                    file_path: record.file_path,
                    display_size,
                });
            }
            Ok(_) => self.status = format!("No APOD cached for {}", date),
            Err(e) => self.status = format!("Failed to read the image cache: {}", e),
        }
    }

    fn step(&mut self, days: i64) {
        let today = Local::now().date_naive();
        let date = (self.selected + chrono::Duration::days(days)).clamp(FIRST_APOD_DATE, today);
        self.show_date(date);
    }

    fn do_update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::DateInputChanged(input) => self.date_input = input,
            Message::DateSubmitted => {
                let today = Local::now().date_naive();
                match crate::apod::parse_apod_date(&self.date_input, today) {
                    Ok(date) => self.show_date(date),
                    Err(e) => self.status = e.to_string(),
                }
            }
            Message::PreviousDay => self.step(-1),
            Message::NextDay => self.step(1),
            Message::EntrySelected(date) => self.show_date(date),
            Message::SetAsDesktop => {
                if let Some(shown) = &self.shown {
                    self.status = match set_desktop_background(&shown.file_path) {
                        Ok(()) => "Desktop background updated".to_string(),
                        Err(e) => format!("Could not set desktop background: {}", e),
                    };
                }
            }
        }
        Task::none()
    }

    fn image_view(&self) -> Element<'_, Message> {
        let Some(shown) = &self.shown else {
            return container(text(&self.status))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into();
        };

        let (width, height) = shown.display_size;
        let content = column![
            text(&shown.title).size(22),
            image(shown.file_path.clone())
                .width(Length::Fixed(width as f32))
                .height(Length::Fixed(height as f32)),
            text(&shown.explanation),
            button("Set as Desktop").on_press(Message::SetAsDesktop),
            text(&self.status),
        ]
        .spacing(12)
        .padding(10);

        scrollable(content).height(Length::Fill).into()
    }

    fn cached_list(&self) -> Element<'_, Message> {
        let entries: Vec<Element<Message>> = self
            .records
            .iter()
            .map(|record| {
                button(text(format!("{}  {}", record.date, record.title)).size(14))
                    .on_press(Message::EntrySelected(record.date))
                    .width(Length::Fill)
                    .into()
            })
            .collect();

        container(scrollable(column(entries).spacing(4)).height(Length::Fill))
            .width(Length::Fixed(260.0))
            .padding(10)
            .into()
    }

    fn theme(&self) -> Theme {
        self.theme.clone()
    }
}

pub fn run_apod_viewer(cache: CacheReader, theme: Theme) -> iced::Result {
    iced::application("APOD Viewer", update, view)
        .theme(|app: &ApodViewer| app.theme())
        .subscription(subscription)
        .window_size(Size {
            width: 1120.0,
            height: 800.0,
        })
        .run_with(move || (ApodViewer::new(cache, theme), Task::none()))
}

fn subscription(_app: &ApodViewer) -> iced::Subscription<Message> {
    iced::keyboard::on_key_press(|key, _modifiers| match key {
        Key::Named(Named::PageUp) => Some(Message::PreviousDay),
        Key::Named(Named::PageDown) => Some(Message::NextDay),
        _ => None,
    })
}

fn update(app: &mut ApodViewer, message: Message) -> Task<Message> {
    app.do_update(message)
}

fn view(app: &ApodViewer) -> Element<'_, Message> {
    let date_bar = row![
        button("<").on_press(Message::PreviousDay),
        text_input("YYYY-MM-DD", &app.date_input)
            .on_input(Message::DateInputChanged)
            .on_submit(Message::DateSubmitted)
            .width(Length::Fixed(140.0)),
        button(">").on_press(Message::NextDay),
        button("Show").on_press(Message::DateSubmitted),
    ]
    .spacing(10)
    .padding(10);

    row![
        app.cached_list(),
        column![date_bar, app.image_view()].width(Length::Fill),
    ]
    .into()
}
