use super::host::{Canvas, Handle, Point, RecordingCanvas};

/// What happens when the turtle leaves the visible area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Keep going off screen.
    Window,
    /// Reappear on the opposite edge.
    Wrap,
    /// Stop at the edge.
    Fence,
}

/// Numbered pen colors accepted by SETCOLOR and COLOR.
const COLOR_NUMBERS: [&str; 16] = [
    "black", "blue", "green", "cyan", "red", "magenta", "yellow", "white", "brown", "tan",
    "forest", "aqua", "salmon", "violet", "orange", "gray",
];

/// A color argument as the canvas wants it: palette index or lowercase name.
pub fn color_name(raw: &str) -> String {
    let raw = raw.trim().trim_matches('"').to_ascii_lowercase();
    match raw.parse::<usize>() {
        Ok(n) if n < COLOR_NUMBERS.len() => COLOR_NUMBERS[n].to_string(),
        _ => raw,
    }
}

/// ## Turtle
///
/// Pose and pen state in turtle space: origin at the middle of the
/// canvas, y up, heading in degrees clockwise from north. Every drawing
/// request is mapped to canvas pixels before it leaves here.

pub struct Turtle {
    x: f64,
    y: f64,
    heading: f64,
    pen_down: bool,
    pen_color: String,
    pen_width: f64,
    fill_color: String,
    visible: bool,
    boundary: Boundary,
    trace: bool,
    center: Point,
    drawn: Vec<Handle>,
    indicator: Option<Handle>,
    canvas: Box<dyn Canvas>,
}

impl Default for Turtle {
    fn default() -> Self {
        Turtle::new(Box::new(RecordingCanvas::default()))
    }
}

impl Turtle {
    pub fn new(canvas: Box<dyn Canvas>) -> Turtle {
        let (w, h) = canvas.size();
        Turtle {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            pen_down: true,
            pen_color: "black".to_string(),
            pen_width: 2.0,
            fill_color: String::new(),
            visible: true,
            boundary: Boundary::Window,
            trace: false,
            center: (w / 2.0, h / 2.0),
            drawn: vec![],
            indicator: None,
            canvas,
        }
    }

    /// Pose and pen back to their defaults. The canvas is left alone.
    pub fn reset(&mut self) {
        let canvas = std::mem::replace(&mut self.canvas, Box::new(RecordingCanvas::default()));
        let drawn = std::mem::take(&mut self.drawn);
        let indicator = self.indicator.take();
        *self = Turtle::new(canvas);
        self.drawn = drawn;
        self.indicator = indicator;
    }

    pub fn x(&self) -> f64 {
        self.x
    }
    pub fn y(&self) -> f64 {
        self.y
    }
    pub fn heading(&self) -> f64 {
        self.heading
    }
    pub fn is_pen_down(&self) -> bool {
        self.pen_down
    }
    pub fn pen_color(&self) -> &str {
        &self.pen_color
    }
    pub fn pen_width(&self) -> f64 {
        self.pen_width
    }
    pub fn fill_color(&self) -> &str {
        &self.fill_color
    }
    pub fn is_visible(&self) -> bool {
        self.visible
    }
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }
    pub fn is_tracing(&self) -> bool {
        self.trace
    }
    /// Handles of everything drawn since the last clear, oldest first.
    pub fn drawn(&self) -> &[Handle] {
        &self.drawn
    }

    pub fn to_screen(&self, x: f64, y: f64) -> Point {
        (self.center.0 + x, self.center.1 - y)
    }

    fn here(&self) -> Point {
        self.to_screen(self.x, self.y)
    }

    /// Moves along the heading; negative distances back up.
    pub fn forward(&mut self, distance: f64) {
        let rad = (90.0 - self.heading).to_radians();
        let nx = self.x + distance * rad.cos();
        let ny = self.y + distance * rad.sin();
        let (nx, ny) = match self.boundary {
            Boundary::Fence => (
                nx.clamp(-self.center.0, self.center.0),
                ny.clamp(-self.center.1, self.center.1),
            ),
            _ => (nx, ny),
        };
        self.line_to(nx, ny);
        if self.boundary == Boundary::Wrap {
            self.x = wrap(self.x, self.center.0);
            self.y = wrap(self.y, self.center.1);
        }
        self.update_indicator();
    }

    /// Positive angles turn right.
    pub fn turn(&mut self, angle: f64) {
        self.heading = (self.heading + angle).rem_euclid(360.0);
        self.update_indicator();
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.heading = heading.rem_euclid(360.0);
        self.update_indicator();
    }

    /// Jumps to a point, drawing the connecting segment when the pen is down.
    pub fn set_pos(&mut self, x: f64, y: f64) {
        self.line_to(x, y);
        self.update_indicator();
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if self.pen_down {
            let from = self.here();
            let to = self.to_screen(x, y);
            let handle = self
                .canvas
                .draw_line(from, to, &self.pen_color, self.pen_width);
            self.drawn.push(handle);
        }
        self.x = x;
        self.y = y;
    }

    pub fn home(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.heading = 0.0;
        self.update_indicator();
    }

    pub fn clear_screen(&mut self) {
        self.canvas.clear();
        self.drawn.clear();
        self.indicator = None;
        self.home();
    }

    /// Points the turtle at `(x, y)`.
    pub fn towards(&mut self, x: f64, y: f64) {
        let heading = (x - self.x).atan2(y - self.y).to_degrees();
        self.set_heading(heading);
    }

    pub fn set_pen_down(&mut self, down: bool) {
        self.pen_down = down;
    }

    pub fn set_pen_color(&mut self, color: &str) {
        self.pen_color = color_name(color);
    }

    pub fn set_pen_width(&mut self, width: f64) {
        self.pen_width = width.trunc().max(1.0);
    }

    pub fn set_fill_color(&mut self, color: &str) {
        self.fill_color = color_name(color);
    }

    pub fn set_background(&mut self, color: &str) {
        self.canvas.set_background(&color_name(color));
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.update_indicator();
    }

    pub fn set_boundary(&mut self, boundary: Boundary) {
        self.boundary = boundary;
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    fn fill(&self) -> Option<&str> {
        if self.fill_color.is_empty() {
            None
        } else {
            Some(&self.fill_color)
        }
    }

    pub fn circle(&mut self, radius: f64) {
        let (cx, cy) = self.here();
        let r = radius.abs();
        let fill = self.fill().map(str::to_string);
        let handle = self.canvas.draw_oval(
            (cx - r, cy - r),
            (cx + r, cy + r),
            &self.pen_color,
            fill.as_deref(),
        );
        self.drawn.push(handle);
    }

    /// Arc of `angle` degrees clockwise, starting at the heading.
    pub fn arc(&mut self, angle: f64, radius: f64) {
        let (cx, cy) = self.here();
        let r = radius.abs();
        let handle = self.canvas.draw_arc(
            (cx - r, cy - r),
            (cx + r, cy + r),
            90.0 - self.heading,
            -angle,
            &self.pen_color,
            self.pen_width,
        );
        self.drawn.push(handle);
    }

    pub fn dot(&mut self, size: f64) {
        let (cx, cy) = self.here();
        let r = (size / 2.0).max(1.0);
        let color = self.pen_color.clone();
        let handle = self
            .canvas
            .draw_oval((cx - r, cy - r), (cx + r, cy + r), &color, Some(&color));
        self.drawn.push(handle);
    }

    /// Rectangle hanging down and right from the turtle.
    pub fn rect(&mut self, width: f64, height: f64) {
        let (cx, cy) = self.here();
        let fill = self.fill().map(str::to_string);
        let handle = self.canvas.draw_rect(
            (cx, cy),
            (cx + width, cy + height),
            &self.pen_color,
            fill.as_deref(),
        );
        self.drawn.push(handle);
    }

    pub fn text(&mut self, text: &str, size: f64) {
        let at = self.here();
        let handle = self.canvas.draw_text(at, text, &self.pen_color, size);
        self.drawn.push(handle);
    }

    /// Leaves a copy of the turtle shape in the pen color.
    pub fn stamp(&mut self) {
        let points = self.shape();
        let color = self.pen_color.clone();
        let handle = self.canvas.draw_polygon(&points, &color, Some(&color));
        self.drawn.push(handle);
    }

    /// Regular polygon traced with forward and turn.
    pub fn polygon(&mut self, sides: usize, length: f64) {
        let sides = sides.max(3);
        let angle = 360.0 / sides as f64;
        for _ in 0..sides {
            self.forward(length);
            self.turn(angle);
        }
    }

    /// Star that skips one vertex per stroke.
    pub fn star(&mut self, points: usize, length: f64) {
        let points = points.max(3);
        let angle = 2.0 * 360.0 / points as f64;
        for _ in 0..points {
            self.forward(length);
            self.turn(angle);
        }
    }

    /// One line of turtle state, as printed by TRACE.
    pub fn describe(&self) -> String {
        format!(
            "TURTLE X={} Y={} HEADING={} PEN={}",
            round2(self.x),
            round2(self.y),
            round2(self.heading),
            if self.pen_down { "DOWN" } else { "UP" }
        )
    }

    fn shape(&self) -> Vec<Point> {
        let (x, y) = self.here();
        let angle = (90.0 - self.heading).to_radians();
        let size = 10.0;
        let corner = |a: f64, len: f64| (x + len * a.cos(), y - len * a.sin());
        vec![
            corner(angle, size),
            corner(angle + 140f64.to_radians(), size * 0.6),
            corner(angle - 140f64.to_radians(), size * 0.6),
        ]
    }

    fn update_indicator(&mut self) {
        if let Some(handle) = self.indicator.take() {
            self.canvas.delete(handle);
        }
        if self.visible {
            let points = self.shape();
            self.indicator = Some(self.canvas.draw_polygon(&points, "darkgreen", Some("green")));
        }
    }
}

fn wrap(v: f64, half: f64) -> f64 {
    if half <= 0.0 || (-half..=half).contains(&v) {
        v
    } else {
        (v + half).rem_euclid(2.0 * half) - half
    }
}

fn round2(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::Shape;

    fn recorded() -> (Turtle, RecordingCanvas) {
        let canvas = RecordingCanvas::default();
        (Turtle::new(Box::new(canvas.clone())), canvas)
    }

    #[test]
    fn test_square_returns_home() {
        let (mut t, canvas) = recorded();
        t.polygon(4, 50.0);
        assert!(t.x().abs() < 1e-9 && t.y().abs() < 1e-9);
        assert_eq!(t.heading(), 0.0);
        assert_eq!(canvas.lines().len(), 4);
        assert_eq!(t.drawn().len(), 4);
    }

    #[test]
    fn test_forward_maps_to_screen() {
        let (mut t, canvas) = recorded();
        t.turn(90.0);
        t.forward(100.0);
        assert!((t.x() - 100.0).abs() < 1e-9);
        let (from, to) = canvas.lines()[0];
        assert_eq!(from, (300.0, 200.0));
        assert!((to.0 - 400.0).abs() < 1e-9 && (to.1 - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_pen_up_draws_nothing() {
        let (mut t, canvas) = recorded();
        t.set_pen_down(false);
        t.forward(10.0);
        assert!(canvas.lines().is_empty());
        assert_eq!(t.y(), 10.0);
    }

    #[test]
    fn test_boundaries() {
        let (mut t, _) = recorded();
        t.set_boundary(Boundary::Fence);
        t.forward(500.0);
        assert_eq!(t.y(), 200.0);
        t.home();
        t.set_boundary(Boundary::Wrap);
        t.forward(250.0);
        assert!((t.y() + 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_screen_resets() {
        let (mut t, canvas) = recorded();
        t.forward(10.0);
        t.turn(45.0);
        t.clear_screen();
        assert!(canvas.lines().is_empty());
        assert_eq!((t.x(), t.y(), t.heading()), (0.0, 0.0, 0.0));
        assert!(t.drawn().is_empty());
    }

    #[test]
    fn test_indicator_follows_turtle() {
        let (mut t, canvas) = recorded();
        t.forward(10.0);
        t.forward(10.0);
        let polygons = canvas
            .shapes()
            .into_iter()
            .filter(|s| matches!(s, Shape::Polygon { .. }))
            .count();
        assert_eq!(polygons, 1);
        t.set_visible(false);
        assert!(canvas
            .shapes()
            .iter()
            .all(|s| !matches!(s, Shape::Polygon { .. })));
    }

    #[test]
    fn test_colors_and_towards() {
        let (mut t, _) = recorded();
        t.set_pen_color("4");
        assert_eq!(t.pen_color(), "red");
        t.set_pen_color("\"Purple\"");
        assert_eq!(t.pen_color(), "purple");
        t.towards(10.0, 0.0);
        assert!((t.heading() - 90.0).abs() < 1e-9);
    }
}
