//! Projection of world-space monitor rectangles onto a character grid
//!
//! The whole layout is padded, scaled to fit the terminal while correcting
//! for non-square cells, centered, and then each monitor is drawn as an
//! outlined box with up to three labels. The selected monitor is drawn last
//! so it always sits on top.

use crate::config::GridStep;
use crate::constants::grid::{
    EMPTY_BOUNDS, MIN_BOX_HEIGHT, MIN_BOX_WIDTH, MIN_RENDER_ROWS, RESERVED_ROWS,
    SCALE_LABEL_EPSILON, TERM_ASPECT, VIEW_PADDING,
};
use crate::rule::{MonitorRule, RuleMap};

/// What a cell belongs to, so the UI can color it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    Blank,
    Monitor,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub role: CellRole,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        role: CellRole::Blank,
    };
}

/// Fixed-size character buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; width * height],
        }
    }

    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn put(&mut self, x: i64, y: i64, ch: char, role: CellRole) {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y))
            && x < self.width
            && y < self.height
        {
            self.cells[y * self.width + x] = Cell { ch, role };
        }
    }

    pub fn row(&self, y: usize) -> &[Cell] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    /// Plain text of every row
    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| self.row(y).iter().map(|cell| cell.ch).collect())
            .collect()
    }
}

/// Border glyph set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxGlyphs {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BoxGlyphs {
    pub const ROUNDED: BoxGlyphs = BoxGlyphs {
        top_left: '╭',
        top_right: '╮',
        bottom_left: '╰',
        bottom_right: '╯',
        horizontal: '─',
        vertical: '│',
    };

    pub const DOUBLE: BoxGlyphs = BoxGlyphs {
        top_left: '╔',
        top_right: '╗',
        bottom_left: '╚',
        bottom_right: '╝',
        horizontal: '═',
        vertical: '║',
    };
}

/// Smallest rectangle containing every rule (min_x, min_y, max_x, max_y)
pub fn world_bounds(rules: &RuleMap) -> (i64, i64, i64, i64) {
    let mut rects = rules.iter().map(MonitorRule::rect);
    let Some(first) = rects.next() else {
        return EMPTY_BOUNDS;
    };
    rects.fold(
        (first.left(), first.top(), first.right(), first.bottom()),
        |(min_x, min_y, max_x, max_y), r| {
            (min_x.min(r.left()), min_y.min(r.top()), max_x.max(r.right()), max_y.max(r.bottom()))
        },
    )
}

/// World-to-cell mapping for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub view_min_x: i64,
    pub view_min_y: i64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: i64,
    pub offset_y: i64,
}

impl Projection {
    /// Fit padded `bounds` into `cols` x `rows` cells
    ///
    /// One axis is shrunk so that `scale_x == scale_y * term_aspect`, which
    /// keeps real-world proportions on cells taller than they are wide.
    pub fn fit(bounds: (i64, i64, i64, i64), cols: usize, rows: usize, term_aspect: f64) -> Self {
        let (min_x, min_y, max_x, max_y) = bounds;
        let total_w = match max_x - min_x {
            w if w <= 0 => EMPTY_BOUNDS.2,
            w => w,
        };
        let total_h = match max_y - min_y {
            h if h <= 0 => EMPTY_BOUNDS.3,
            h => h,
        };

        let view_min_x = min_x - VIEW_PADDING / 2;
        let view_min_y = min_y - VIEW_PADDING / 2;
        let view_w = (total_w + VIEW_PADDING) as f64;
        let view_h = (total_h + VIEW_PADDING) as f64;

        let mut scale_x = cols as f64 / view_w;
        let mut scale_y = rows as f64 / view_h;
        if scale_x > scale_y * term_aspect {
            scale_x = scale_y * term_aspect;
        } else {
            scale_y = scale_x / term_aspect;
        }

        let offset_x = (cols as i64 - (view_w * scale_x) as i64) / 2;
        let offset_y = (rows as i64 - (view_h * scale_y) as i64) / 2;

        Self {
            view_min_x,
            view_min_y,
            scale_x,
            scale_y,
            offset_x,
            offset_y,
        }
    }

    pub fn to_cell(&self, wx: i64, wy: i64) -> (i64, i64) {
        let tx = self.offset_x + ((wx - self.view_min_x) as f64 * self.scale_x) as i64;
        let ty = self.offset_y + ((wy - self.view_min_y) as f64 * self.scale_y) as i64;
        (tx, ty)
    }
}

/// A monitor's box in cell space, after minimum size and clipping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorBox {
    pub id: String,
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub selected: bool,
}

/// A rendered frame: header line plus the drawing area
#[derive(Debug, Clone)]
pub struct GridFrame {
    pub header: String,
    pub canvas: Canvas,
}

#[derive(Debug, Clone, Copy)]
pub struct GridRenderer {
    term_aspect: f64,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self {
            term_aspect: TERM_ASPECT,
        }
    }
}

impl GridRenderer {
    pub fn with_term_aspect(term_aspect: f64) -> Self {
        Self { term_aspect }
    }

    /// Rows available for drawing in a terminal `height` rows tall
    pub fn render_rows(height: u16) -> usize {
        usize::from(height.saturating_sub(RESERVED_ROWS)).max(MIN_RENDER_ROWS)
    }

    /// Boxes in draw order: others by ascending id, then the selected one
    pub fn layout(&self, rules: &RuleMap, selected: Option<&str>, cols: usize, rows: usize) -> Vec<MonitorBox> {
        let projection = Projection::fit(world_bounds(rules), cols, rows, self.term_aspect);

        let mut ids = rules.sorted_ids();
        if let Some(selected) = selected
            && let Some(pos) = ids.iter().position(|id| *id == selected)
        {
            let id = ids.remove(pos);
            ids.push(id);
        }

        ids.into_iter()
            .filter_map(|id| rules.get(id))
            .filter_map(|rule| {
                let rect = rule.rect();
                let (mut x1, mut y1) = projection.to_cell(rect.left(), rect.top());
                let (mut x2, mut y2) = projection.to_cell(rect.right(), rect.bottom());

                if x2 - x1 < MIN_BOX_WIDTH {
                    x2 = x1 + MIN_BOX_WIDTH;
                }
                if y2 - y1 < MIN_BOX_HEIGHT {
                    y2 = y1 + MIN_BOX_HEIGHT;
                }

                x1 = x1.max(0);
                y1 = y1.max(0);
                x2 = x2.min(cols as i64 - 1);
                y2 = y2.min(rows as i64 - 1);
                if x1 > x2 || y1 > y2 {
                    return None;
                }

                Some(MonitorBox {
                    id: rule.id.clone(),
                    x1,
                    y1,
                    x2,
                    y2,
                    selected: selected == Some(rule.id.as_str()),
                })
            })
            .collect()
    }

    /// Draw `rules` into a frame for a terminal of `width` x `height` cells
    pub fn render(
        &self,
        rules: &RuleMap,
        selected: Option<&str>,
        grid_step: GridStep,
        width: u16,
        height: u16,
    ) -> GridFrame {
        let cols = usize::from(width);
        let rows = Self::render_rows(height);
        let mut canvas = Canvas::new(cols, rows);

        for monitor in self.layout(rules, selected, cols, rows) {
            let Some(rule) = rules.get(&monitor.id) else {
                continue;
            };
            let (glyphs, role) = if monitor.selected {
                (BoxGlyphs::DOUBLE, CellRole::Selected)
            } else {
                (BoxGlyphs::ROUNDED, CellRole::Monitor)
            };
            draw_box(&mut canvas, &monitor, glyphs, role);

            for (row, label) in labels(rule).iter().enumerate() {
                let y = monitor.y1 + 1 + row as i64;
                if y < monitor.y2 {
                    draw_text(&mut canvas, monitor.x1 + 1, y, monitor.x2 - 1, label, role);
                }
            }
        }

        GridFrame {
            header: format!("Grid: {} px", grid_step.pixels()),
            canvas,
        }
    }
}

fn labels(rule: &MonitorRule) -> Vec<String> {
    let mut labels = vec![
        format!("{} [ON]", rule.id),
        format!("{}x{}@{:.0}Hz", rule.width, rule.height, rule.refresh_rate),
    ];
    if (rule.scale - 1.0).abs() > SCALE_LABEL_EPSILON {
        labels.push(format!("x{:.2}", rule.scale));
    }
    labels
}

/// Outline only; the interior is left untouched
fn draw_box(canvas: &mut Canvas, b: &MonitorBox, glyphs: BoxGlyphs, role: CellRole) {
    for y in b.y1..=b.y2 {
        for x in b.x1..=b.x2 {
            let ch = match (x == b.x1, x == b.x2, y == b.y1, y == b.y2) {
                (true, _, true, _) => glyphs.top_left,
                (_, true, true, _) => glyphs.top_right,
                (true, _, _, true) => glyphs.bottom_left,
                (_, true, _, true) => glyphs.bottom_right,
                (_, _, true, _) | (_, _, _, true) => glyphs.horizontal,
                (true, _, _, _) | (_, true, _, _) => glyphs.vertical,
                _ => continue,
            };
            canvas.put(x, y, ch, role);
        }
    }
}

/// Write `text` from `x`, stopping after column `max_x`
fn draw_text(canvas: &mut Canvas, x: i64, y: i64, max_x: i64, text: &str, role: CellRole) {
    for (i, ch) in text.chars().enumerate() {
        let cx = x + i as i64;
        if cx > max_x {
            break;
        }
        canvas.put(cx, y, ch, role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, x: i32, y: i32, width: u32, height: u32) -> MonitorRule {
        MonitorRule {
            x,
            y,
            width,
            height,
            ..MonitorRule::seeded(id)
        }
    }

    fn extent(boxes: &[MonitorBox]) -> (i64, i64, i64, i64) {
        boxes.iter().fold((i64::MAX, i64::MAX, i64::MIN, i64::MIN), |acc, b| {
            (acc.0.min(b.x1), acc.1.min(b.y1), acc.2.max(b.x2), acc.3.max(b.y2))
        })
    }

    fn text(frame: &GridFrame) -> String {
        frame.canvas.lines().join("\n")
    }

    #[test]
    fn test_world_bounds_empty_and_negative() {
        assert_eq!(world_bounds(&RuleMap::new()), (0, 0, 1920, 1080));

        let rules: RuleMap = [rule("a", -1280, -200, 1280, 1024), rule("b", 0, 0, 1920, 1080)]
            .into_iter()
            .collect();
        assert_eq!(world_bounds(&rules), (-1280, -200, 1920, 1080));
    }

    #[test]
    fn test_render_rows_reserves_header_and_footer() {
        assert_eq!(GridRenderer::render_rows(40), 38);
        assert_eq!(GridRenderer::render_rows(5), 10);
    }

    #[test]
    fn test_projection_keeps_aspect_ratio() {
        for (cols, rows) in [(200, 58), (80, 40), (300, 20)] {
            let projection = Projection::fit((0, 0, 1920, 1080), cols, rows, TERM_ASPECT);
            assert!((projection.scale_x / projection.scale_y - TERM_ASPECT).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rendered_box_ratio_matches_world_ratio() {
        let rules: RuleMap = [rule("a", 0, 0, 1920, 1080)].into_iter().collect();
        let boxes = GridRenderer::default().layout(&rules, None, 200, 58);
        let b = &boxes[0];
        let (w_cells, h_cells) = ((b.x2 - b.x1) as f64, (b.y2 - b.y1) as f64);

        let world_aspect = 1920.0 / 1080.0;
        assert!((w_cells / (world_aspect * TERM_ASPECT) - h_cells).abs() <= 1.0);
    }

    #[test]
    fn test_unit_aspect_parameter_gives_square_scales() {
        let projection = Projection::fit((0, 0, 1000, 1000), 100, 50, 1.0);
        assert_eq!(projection.scale_x, projection.scale_y);
    }

    #[test]
    fn test_identical_bounds_give_identical_extent() {
        let split: RuleMap = [rule("a", 0, 0, 1920, 1080), rule("b", 1920, 0, 1920, 1080)]
            .into_iter()
            .collect();
        let single: RuleMap = [rule("wide", 0, 0, 3840, 1080)].into_iter().collect();

        let renderer = GridRenderer::default();
        assert_eq!(
            extent(&renderer.layout(&split, None, 160, 48)),
            extent(&renderer.layout(&single, Some("wide"), 160, 48))
        );
    }

    #[test]
    fn test_boxes_are_clipped_and_min_sized() {
        let rules: RuleMap = [rule("tiny", 0, 0, 1, 1), rule("big", 0, 0, 10_000, 10_000)]
            .into_iter()
            .collect();
        let boxes = GridRenderer::default().layout(&rules, None, 40, 12);

        let tiny = boxes.iter().find(|b| b.id == "tiny").unwrap();
        assert!(tiny.x2 - tiny.x1 >= MIN_BOX_WIDTH.min(39));
        assert!(tiny.y2 - tiny.y1 >= MIN_BOX_HEIGHT.min(11));
        for b in &boxes {
            assert!(b.x1 >= 0 && b.y1 >= 0);
            assert!(b.x2 < 40 && b.y2 < 12);
        }
    }

    #[test]
    fn test_draw_order_puts_selected_last() {
        let rules: RuleMap = [rule("b", 0, 0, 1920, 1080), rule("a", 0, 0, 1920, 1080), rule("c", 0, 0, 10, 10)]
            .into_iter()
            .collect();
        let order: Vec<String> = GridRenderer::default()
            .layout(&rules, Some("a"), 120, 40)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_selected_box_is_drawn_on_top() {
        let rules: RuleMap = [rule("a", 0, 0, 1920, 1080), rule("b", 0, 0, 1920, 1080)]
            .into_iter()
            .collect();
        let renderer = GridRenderer::default();
        let boxes = renderer.layout(&rules, Some("a"), 120, 40);
        let frame = renderer.render(&rules, Some("a"), GridStep::default(), 120, 42);

        let a = boxes.iter().find(|b| b.id == "a").unwrap();
        let corner = frame.canvas.row(a.y1 as usize)[a.x1 as usize];
        assert_eq!(corner, Cell { ch: '╔', role: CellRole::Selected });
    }

    #[test]
    fn test_labels_and_header() {
        let mut scaled = rule("eDP-1", 0, 0, 1920, 1080);
        scaled.scale = 2.0;
        let rules: RuleMap = [scaled, rule("HDMI-A-1", 1920, 0, 3840, 2160)].into_iter().collect();

        let frame = GridRenderer::default().render(&rules, Some("eDP-1"), GridStep::new(16).unwrap(), 160, 50);
        let body = text(&frame);

        assert_eq!(frame.header, "Grid: 16 px");
        assert!(body.contains("eDP-1 [ON]"));
        assert!(body.contains("1920x1080@60Hz"));
        assert!(body.contains("x2.00"));
        assert!(body.contains("3840x2160@60Hz"));
        // Unscaled monitors get no scale label
        assert_eq!(body.matches("x1.00").count(), 0);
    }

    #[test]
    fn test_labels_are_truncated_to_box() {
        let rules: RuleMap = [rule("a-very-long-output-name", 0, 0, 10, 10)].into_iter().collect();
        let renderer = GridRenderer::default();
        let boxes = renderer.layout(&rules, None, 80, 24);
        let b = &boxes[0];
        let frame = renderer.render(&rules, None, GridStep::default(), 80, 26);

        let row = &frame.canvas.lines()[(b.y1 + 1) as usize];
        let right_border: char = row.chars().nth(b.x2 as usize).unwrap();
        assert_eq!(right_border, BoxGlyphs::ROUNDED.vertical);
        assert!(!row.contains("a-very-long-output-name"));
    }

    #[test]
    fn test_empty_rules_render_blank_canvas() {
        let frame = GridRenderer::default().render(&RuleMap::new(), None, GridStep::default(), 30, 14);
        assert_eq!(frame.canvas.width(), 30);
        assert_eq!(frame.canvas.height(), 12);
        assert!(frame.canvas.lines().iter().all(|line| line.trim().is_empty()));
        assert_eq!(frame.header, "Grid: 1 px");
    }
}
