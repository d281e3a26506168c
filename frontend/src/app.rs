use std::time::Duration;

use egui::{Color32, Pos2, Rect, Stroke, Vec2};
use log::{debug, info, warn};
use pathfind::{
    util::{cell_color, GRID_LINE},
    Grid, PathFinderState, Point, SearchSession, SelectionError, Settings,
};

/// Side length of one cell in points
const CELL_SIZE: f32 = 20.0;

pub struct App {
    state: State,
    grid: Grid,
    session: Option<SearchSession>,
    status: String,
    output_cell: String,
}

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
struct State {
    settings: Settings,
    draw_grid_lines: bool,
    auto_step: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            draw_grid_lines: true,
            auto_step: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Start,
    End,
}

impl App {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load previous app state (if any).
        // Note that you must enable the `persistence` feature for this to work.
        let mut state: State = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        if let Err(err) = state.settings.validate() {
            warn!("discarding stored settings: {}", err);
            state.settings = Settings::default();
        }

        let grid = state
            .settings
            .generate()
            .expect("validated settings always produce a maze");

        App {
            state,
            grid,
            session: None,
            status: "Left click: start, right click: end, space: search".to_owned(),
            output_cell: Default::default(),
        }
    }

    fn regenerate(&mut self) {
        self.cancel_search();
        match self.state.settings.generate() {
            Ok(grid) => {
                self.grid = grid;
                self.status = "New maze".to_owned();
            }
            Err(err) => {
                warn!("cannot generate maze: {}", err);
                self.status = err.to_string();
            }
        }
    }

    fn clear(&mut self) {
        self.cancel_search();
        self.grid.clear_selection();
        self.status = "Selection cleared".to_owned();
    }

    fn select(&mut self, point: Point, role: Role) {
        if self.session.is_some() {
            return;
        }
        let result = match role {
            Role::Start => self.grid.set_start(point),
            Role::End => self.grid.set_end(point),
        };
        match result {
            Ok(()) => debug!("{:?} set to {}", role, point),
            // re-selecting is expected while clicking around, no need to report it
            Err(SelectionError::AlreadySet(_)) => {}
            Err(err) => {
                warn!("{:?} rejected: {}", role, err);
                self.status = err.to_string();
            }
        }
    }

    fn start_search(&mut self) {
        if self.session.is_some() {
            return;
        }
        match self.grid.begin_search() {
            Ok(session) => {
                self.session = Some(session);
                self.status = "Searching...".to_owned();
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn cancel_search(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
            self.status = "Search cancelled".to_owned();
        }
    }

    /// Advances the running search, returning the outcome once it is done
    fn step_search(&mut self, steps: usize) -> Option<PathFinderState<Point>> {
        let session = self.session.as_mut()?;
        for _ in 0..steps {
            match session.step(&mut self.grid) {
                Ok(state) if state.is_done() => {
                    self.session = None;
                    return Some(state);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("search stopped: {}", err);
                    self.status = err.to_string();
                    self.session = None;
                    return None;
                }
            }
        }
        None
    }

    fn report(&mut self, ctx: &egui::Context, state: PathFinderState<Point>) {
        let title = match state {
            PathFinderState::PathFound(result) => {
                info!("shortest path found, {} moves", result.total_cost);
                format!("Shortest path found ({} moves)", result.total_cost)
            }
            _ => {
                info!("no path found");
                "Path not found".to_owned()
            }
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
        self.status = title;
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (space, escape, regenerate, clear) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::R),
                i.key_pressed(egui::Key::C),
            )
        });

        if space {
            self.start_search();
        }
        if escape {
            self.cancel_search();
        }
        if regenerate {
            self.regenerate();
        }
        if clear {
            self.clear();
        }
    }
}

impl eframe::App for App {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.state);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);

                egui::widgets::global_dark_light_mode_buttons(ui);
            });
        });

        egui::SidePanel::left("side_panel").show(ctx, |ui| {
            ui.heading("Maze");
            let settings = &mut self.state.settings;
            ui.add(egui::Slider::new(&mut settings.rows, 1..=60).text("Rows"));
            ui.add(egui::Slider::new(&mut settings.columns, 1..=60).text("Columns"));
            ui.add(
                egui::Slider::new(&mut settings.open_probability, 0.0..=1.0)
                    .text("Open probability"),
            );
            let mut fixed_seed = settings.seed.is_some();
            ui.horizontal(|ui| {
                ui.checkbox(&mut fixed_seed, "Fixed seed");
                if fixed_seed {
                    ui.add(egui::DragValue::new(settings.seed.get_or_insert(0)));
                } else {
                    settings.seed = None;
                }
            });
            ui.horizontal(|ui| {
                if ui.button("New maze (R)").clicked() {
                    self.regenerate();
                }
                if ui.button("Clear (C)").clicked() {
                    self.clear();
                }
            });
            ui.checkbox(&mut self.state.draw_grid_lines, "Draw grid lines");

            ui.separator();
            ui.heading("Search");
            ui.horizontal(|ui| {
                if ui.button("Run (Space)").clicked() {
                    self.start_search();
                }
                if ui.button("Cancel (Esc)").clicked() {
                    self.cancel_search();
                }
            });
            ui.horizontal(|ui| {
                if ui.button("Step").clicked() {
                    self.start_search();
                    if let Some(state) = self.step_search(1) {
                        self.report(ctx, state);
                    }
                }
                if ui.button("Finish").clicked() {
                    self.start_search();
                    if let Some(state) = self.step_search(usize::MAX) {
                        self.report(ctx, state);
                    }
                }
            });
            ui.checkbox(&mut self.state.auto_step, "Auto Step");
            ui.add(
                egui::Slider::new(&mut self.state.settings.steps_per_frame, 1..=50)
                    .text("Steps per frame"),
            );

            ui.separator();
            ui.label(&self.status);
            ui.label(&self.output_cell);

            ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                egui::warn_if_debug_build(ui);
            });
        });

        if self.state.auto_step && self.session.is_some() {
            let steps = self.state.settings.steps_per_frame.max(1);
            if let Some(state) = self.step_search(steps) {
                self.report(ctx, state);
            }
            ctx.request_repaint_after(Duration::from_millis(20));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                self.grid_painting(ui);
            });
        });
    }
}

impl App {
    fn grid_painting(&mut self, ui: &mut egui::Ui) {
        let size = Vec2::new(
            self.grid.columns() as f32 * CELL_SIZE,
            self.grid.rows() as f32 * CELL_SIZE,
        );
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click());
        let origin = response.rect.min;
        let [r, g, b] = GRID_LINE;
        let line = Stroke::new(1.0, Color32::from_rgb(r, g, b));

        for point in self.grid.points() {
            let Some(view) = self.grid.view(point) else {
                continue;
            };
            let [r, g, b] = cell_color(view);
            let rect = Rect::from_min_size(
                origin + Vec2::new(point.col as f32, point.row as f32) * CELL_SIZE,
                Vec2::splat(CELL_SIZE),
            );
            painter.rect_filled(rect, 0.0, Color32::from_rgb(r, g, b));
            if self.state.draw_grid_lines {
                painter.rect_stroke(rect, 0.0, line);
            }
        }

        // get the cell the user is hovering over
        let hovered = response
            .hover_pos()
            .and_then(|pos| pointer_to_point(origin, pos, &self.grid));
        if let Some(point) = hovered {
            let g_score = self.session.as_ref().and_then(|s| s.g_score(point));
            self.output_cell = format!(
                "Cell {}\n{:#?}\ng score: {:?}",
                point,
                self.grid.cell(point),
                g_score
            );
        }

        let pointer = response.interact_pointer_pos();
        if let Some(point) = pointer.and_then(|pos| pointer_to_point(origin, pos, &self.grid)) {
            if response.clicked() {
                self.select(point, Role::Start);
            } else if response.secondary_clicked() {
                self.select(point, Role::End);
            }
        }
    }
}

/// Maps a screen position inside the painted grid to the cell under it
fn pointer_to_point(origin: Pos2, pos: Pos2, grid: &Grid) -> Option<Point> {
    let offset = (pos - origin) / CELL_SIZE;
    if offset.x < 0.0 || offset.y < 0.0 {
        return None;
    }
    let point = Point {
        row: offset.y as usize,
        col: offset.x as usize,
    };
    grid.is_valid(point).then_some(point)
}
