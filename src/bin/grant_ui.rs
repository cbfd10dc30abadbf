//! Grant Analyzer - Graphical User Interface
//!
//! Upload a grant PDF or enter a guidelines URL, run the analysis and review
//! the eligibility checklist, deadlines, funding and required documents.

use grant_analyzer::config::load_settings;
use grant_analyzer::errors::{ErrorPresentation, Severity};
use grant_analyzer::formatter::{Fragment, Span};
use grant_analyzer::pipeline::{self, AnalysisOutcome};
use grant_analyzer::print::write_print_document;
use grant_analyzer::service::{AnalysisService, SampleAnalysisService};
use grant_analyzer::state::{Rejected, Submission, TICK_INTERVAL};
use grant_analyzer::validation::{format_file_size, validate_inputs};
use grant_analyzer::{
    Analyzer, FormattedSection, GrantAnalysisResult, InputMode, ProcessingState, RequestToken,
};
use iced::widget::{
    button, column, container, progress_bar, row, rule, scrollable, text, text_input,
};
use iced::{Center, Color, Element, Fill, Font, Subscription, Task, Theme};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() -> iced::Result {
    env_logger::init();
    iced::application(App::new, App::update, App::view)
        .subscription(App::subscription)
        .theme(App::theme)
        .centered()
        .run()
}

// ============================================================================
// App State
// ============================================================================

struct App {
    analyzer: Analyzer,
    service: Arc<dyn AnalysisService>,

    // Raw text as typed; the analyzer holds the trimmed copy
    url_text: String,

    // Print export
    print_output: Option<PathBuf>,
    status_text: String,
}

impl App {
    fn theme(&self) -> Theme {
        Theme::Light
    }

    fn new() -> (Self, Task<Message>) {
        let settings = load_settings();
        let (service, status_text) = match settings.build_service() {
            Ok(service) => (service, String::new()),
            Err(e) => {
                log::warn!("{:#}; falling back to sample results", e);
                let fallback: Arc<dyn AnalysisService> = Arc::new(SampleAnalysisService::new(
                    Duration::from_millis(settings.sample_delay_ms),
                ));
                (fallback, format!("{}. Showing sample results.", e))
            }
        };

        (
            App {
                analyzer: Analyzer::new(settings.analyzer_config()),
                service,
                url_text: String::new(),
                print_output: None,
                status_text,
            },
            Task::none(),
        )
    }

    fn subscription(&self) -> Subscription<Message> {
        let drops = iced::event::listen_with(|event, _status, _window| match event {
            iced::Event::Window(iced::window::Event::FileDropped(path)) => {
                Some(Message::PdfSelected(Some(path)))
            }
            _ => None,
        });

        if self.analyzer.needs_ticks() {
            Subscription::batch([
                drops,
                iced::time::every(TICK_INTERVAL).map(|_| Message::Tick),
            ])
        } else {
            drops
        }
    }

    fn start(&mut self, submission: Result<Submission, Rejected>) -> Task<Message> {
        match submission {
            Ok(submission) => {
                self.print_output = None;
                self.status_text.clear();
                Task::perform(
                    pipeline::dispatch(self.service.clone(), submission),
                    |(token, outcome)| Message::AnalysisFinished(token, outcome),
                )
            }
            Err(rejected) => {
                log::debug!("Submission refused: {}", rejected);
                Task::none()
            }
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone)]
enum Message {
    // Input mode tabs
    ModeSelected(InputMode),

    // PDF input
    BrowsePdf,
    PdfSelected(Option<PathBuf>),
    RemoveFile,

    // URL input
    UrlChanged(String),

    // Processing
    Analyze,
    Cancel,
    Tick,
    AnalysisFinished(RequestToken, AnalysisOutcome),

    // Error banner
    Retry,
    DismissError,

    // Results
    Reset,
    ExportPrint,
    PrintPathSelected(Option<PathBuf>),
    OpenPrint,
}

// ============================================================================
// Update
// ============================================================================

impl App {
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            // -- Input --
            Message::ModeSelected(mode) => {
                self.analyzer.set_mode(mode);
                Task::none()
            }
            Message::BrowsePdf => Task::perform(
                async {
                    let file = rfd::AsyncFileDialog::new()
                        .set_title("Select grant guidelines PDF")
                        .add_filter("PDF files", &["pdf"])
                        .pick_file()
                        .await;
                    file.map(|f| f.path().to_path_buf())
                },
                Message::PdfSelected,
            ),
            Message::PdfSelected(path) => {
                if let Some(p) = path {
                    if !self.analyzer.accepts_input() {
                        return Task::none();
                    }
                    match pipeline::file_candidate_from_path(&p) {
                        Ok(candidate) => {
                            self.status_text.clear();
                            self.analyzer.set_mode(InputMode::Pdf);
                            self.analyzer.select_file(candidate, Instant::now());
                        }
                        Err(e) => self.status_text = format!("{:#}", e),
                    }
                }
                Task::none()
            }
            Message::RemoveFile => {
                self.analyzer.remove_file();
                Task::none()
            }
            Message::UrlChanged(v) => {
                if self.analyzer.accepts_input() {
                    self.analyzer.set_url(&v, Instant::now());
                    self.url_text = v;
                }
                Task::none()
            }

            // -- Processing --
            Message::Analyze => {
                let submission = self.analyzer.submit(Instant::now());
                self.start(submission)
            }
            Message::Retry => {
                let submission = self.analyzer.retry(Instant::now());
                self.start(submission)
            }
            Message::Cancel => {
                self.analyzer.cancel();
                Task::none()
            }
            Message::Tick => {
                self.analyzer.tick(Instant::now());
                Task::none()
            }
            Message::AnalysisFinished(token, outcome) => {
                self.analyzer.complete(token, outcome, Instant::now());
                Task::none()
            }
            Message::DismissError => {
                self.analyzer.dismiss_error();
                Task::none()
            }

            // -- Results --
            Message::Reset => {
                self.analyzer.reset();
                self.url_text.clear();
                self.print_output = None;
                self.status_text.clear();
                Task::none()
            }
            Message::ExportPrint => Task::perform(
                async {
                    let file = rfd::AsyncFileDialog::new()
                        .add_filter("HTML files", &["html"])
                        .set_file_name("grant-analysis.html")
                        .save_file()
                        .await;
                    file.map(|f| f.path().to_path_buf())
                },
                Message::PrintPathSelected,
            ),
            Message::PrintPathSelected(path) => {
                let (Some(p), Some(results)) = (path, self.analyzer.formatted_results()) else {
                    return Task::none();
                };
                let today = chrono::Local::now().date_naive();
                match write_print_document(&p, &results, today) {
                    Ok(()) => {
                        self.status_text = format!("Saved {}", p.display());
                        self.print_output = Some(p);
                    }
                    Err(e) => self.status_text = format!("Error: {:#}", e),
                }
                Task::none()
            }
            Message::OpenPrint => {
                if let Some(path) = &self.print_output {
                    let _ = std::process::Command::new(open_command()).arg(path).spawn();
                }
                Task::none()
            }
        }
    }
}

fn open_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    }
}

// ============================================================================
// View
// ============================================================================

impl App {
    fn view(&self) -> Element<'_, Message> {
        let header = column![
            text("Grant Analyzer").size(28),
            text("Extract eligibility, deadlines, funding and required documents from grant guidelines").size(14),
        ]
        .spacing(4);

        let content: Element<'_, Message> = match self.analyzer.state() {
            ProcessingState::Success { result } => self.view_results(result),
            _ => self.view_input(),
        };

        let mut body = column![header, rule::horizontal(1), content].spacing(16);
        if !self.status_text.is_empty() {
            body = body.push(text(&self.status_text).size(13).color(MUTED));
        }

        container(scrollable(container(body).padding(20).width(Fill)))
            .width(Fill)
            .height(Fill)
            .into()
    }

    // -- Input form --
    fn view_input(&self) -> Element<'_, Message> {
        let mode = self.analyzer.input().mode;
        let editable = self.analyzer.accepts_input();

        let tab_bar = row![
            tab_button("Upload PDF", InputMode::Pdf, mode, editable),
            tab_button("Enter URL", InputMode::Url, mode, editable),
        ]
        .spacing(4);

        let panel: Element<'_, Message> = match mode {
            InputMode::Pdf => self.view_pdf_panel(editable),
            InputMode::Url => column![
                text("Grant guidelines URL").size(16),
                text_input("https://example.com/grant-guidelines", &self.url_text)
                    .on_input_maybe(if editable {
                        Some(Message::UrlChanged)
                    } else {
                        None
                    })
                    .on_submit_maybe(if self.analyzer.can_submit() {
                        Some(Message::Analyze)
                    } else {
                        None
                    }),
            ]
            .spacing(8)
            .into(),
        };

        let mut analyze = button(text(self.analyzer.submit_label()));
        if self.analyzer.can_submit() {
            analyze = analyze.on_press(Message::Analyze);
        }

        let mut form = column![tab_bar, panel, analyze].spacing(16);

        let input = self.analyzer.input();
        if editable && input.has_file() && input.has_url() {
            if let Some(hint) = validate_inputs(input).message() {
                form = form.push(text(hint.to_string()).size(13).color(MUTED));
            }
        }

        if let ProcessingState::Processing { message, .. } = self.analyzer.state() {
            form = form.push(
                column![
                    progress_bar(0.0..=1.0, self.analyzer.progress() / 100.0),
                    row![
                        text(message).size(13),
                        button(text("Cancel").size(13))
                            .on_press(Message::Cancel)
                            .style(button::text),
                    ]
                    .spacing(10)
                    .align_y(Center),
                ]
                .spacing(4),
            );
        }

        if let (ProcessingState::Error { message, .. }, Some(presentation)) =
            (self.analyzer.state(), self.analyzer.error_presentation())
        {
            form = form.push(error_banner(message, presentation));
        }

        form.into()
    }

    fn view_pdf_panel(&self, editable: bool) -> Element<'_, Message> {
        let selected: Element<'_, Message> = match &self.analyzer.input().file {
            Some(file) => {
                let mut remove = button(text("Remove").size(13)).style(button::secondary);
                if editable {
                    remove = remove.on_press(Message::RemoveFile);
                }
                row![
                    text("📄").size(20),
                    column![
                        text(&file.name).size(14),
                        text(format_file_size(file.size_bytes)).size(12).color(MUTED),
                    ]
                    .width(Fill),
                    remove,
                ]
                .spacing(10)
                .align_y(Center)
                .into()
            }
            None => text("Drop your PDF here or browse for a file (PDF only, up to 10MB)")
                .size(13)
                .color(MUTED)
                .into(),
        };

        let mut browse = button(text("Browse").size(13));
        if editable {
            browse = browse.on_press(Message::BrowsePdf);
        }

        column![text("Grant guidelines PDF").size(16), selected, browse]
            .spacing(8)
            .into()
    }

    // -- Results --
    fn view_results<'a>(&'a self, result: &GrantAnalysisResult) -> Element<'a, Message> {
        let formatted = grant_analyzer::format_results(result);
        let sections: Vec<Element<'a, Message>> =
            formatted.sections().into_iter().map(section_view).collect();

        let mut actions = row![
            button(text("Analyze Another Document")).on_press(Message::Reset),
            button(text("Print Results"))
                .on_press(Message::ExportPrint)
                .style(button::secondary),
        ]
        .spacing(10);
        if self.print_output.is_some() {
            actions = actions.push(
                button(text("Open"))
                    .on_press(Message::OpenPrint)
                    .style(button::text),
            );
        }

        column![
            text("Analysis Results").size(22),
            column(sections).spacing(20),
            actions,
        ]
        .spacing(16)
        .into()
    }
}

// ============================================================================
// View helpers
// ============================================================================

const MUTED: Color = Color::from_rgb(0.45, 0.45, 0.45);
const HIGHLIGHT: Color = Color::from_rgb(0.02, 0.59, 0.41);

/// Shown in place of an empty section.
const EMPTY_SECTION: &str = "Information not found in document";

/// Render a mode tab, styled differently when active.
fn tab_button(label: &str, mode: InputMode, active: InputMode, enabled: bool) -> Element<'_, Message> {
    let btn = button(text(label).size(14));
    if mode == active {
        btn.style(button::primary).into()
    } else {
        btn.on_press_maybe(if enabled {
            Some(Message::ModeSelected(mode))
        } else {
            None
        })
        .style(button::secondary)
        .into()
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::from_rgb(0.80, 0.15, 0.15),
        Severity::Warning => Color::from_rgb(0.90, 0.45, 0.05),
        Severity::Caution => Color::from_rgb(0.75, 0.60, 0.0),
    }
}

fn error_banner(message: &str, presentation: ErrorPresentation) -> Element<'_, Message> {
    let mut actions = row![].spacing(8);
    if presentation.retryable {
        actions = actions.push(button(text("Retry").size(13)).on_press(Message::Retry));
    }
    actions = actions.push(
        button(text("Dismiss").size(13))
            .on_press(Message::DismissError)
            .style(button::secondary),
    );

    container(
        row![
            text(presentation.icon).size(20),
            text(message)
                .size(14)
                .color(severity_color(presentation.severity))
                .width(Fill),
            actions,
        ]
        .spacing(10)
        .align_y(Center),
    )
    .padding(12)
    .width(Fill)
    .style(container::rounded_box)
    .into()
}

fn section_view<'a>(section: &FormattedSection) -> Element<'a, Message> {
    let mut items = column![text(section.kind.title()).size(18), rule::horizontal(1)].spacing(6);

    if section.is_empty() {
        items = items.push(text(EMPTY_SECTION).size(13).color(MUTED));
    }
    for fragment in &section.fragments {
        items = items.push(fragment_view(fragment));
    }

    items.into()
}

fn fragment_view<'a>(fragment: &Fragment) -> Element<'a, Message> {
    let mut line = row![text(fragment.glyph.symbol()).size(14).width(24)].spacing(4);
    for span in &fragment.spans {
        line = line.push(match span {
            Span::Text(s) => text(s.clone()).size(14),
            Span::Emphasis(s) => text(s.clone()).size(14).color(HIGHLIGHT).font(Font {
                weight: iced::font::Weight::Bold,
                ..Font::DEFAULT
            }),
        });
    }
    line.into()
}
