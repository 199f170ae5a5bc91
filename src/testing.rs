use crate::config::PlotterConfig;
use crate::plotter::{GerberPlotter, PlotSession};
use crate::units::Viewport;

/// Run `draw` against a fresh plot and return the finished file.
pub fn plot_to_string<F>(config: PlotterConfig, viewport: Viewport, draw: F) -> String
where
    F: FnOnce(&mut PlotSession<Vec<u8>>),
{
    let mut plotter = GerberPlotter::new(config).expect("Invalid plotter config");
    plotter
        .set_viewport(viewport)
        .expect("Invalid viewport");

    let mut session = plotter.start_plot(Vec::new());
    draw(&mut session);
    let bytes = session.end_plot().expect("Could not finish plot");

    String::from_utf8(bytes).unwrap()
}

pub fn dump_gerber_source(gerber_source: &str) {
    println!("Gerber source:\n{}", gerber_source);
}

/// The lines between the end of the aperture list and the end of the file.
pub fn drawing_lines(gerber_source: &str) -> Vec<&str> {
    gerber_source
        .lines()
        .skip_while(|line| *line != "G04 APERTURE END LIST*")
        .skip(1)
        .collect()
}

/// The `%ADD...*%` definitions, in file order.
pub fn aperture_definitions(gerber_source: &str) -> Vec<&str> {
    gerber_source
        .lines()
        .filter(|line| line.starts_with("%ADD"))
        .collect()
}

pub fn count_lines(gerber_source: &str, expected: &str) -> usize {
    gerber_source
        .lines()
        .filter(|line| *line == expected)
        .count()
}

pub mod geometry {
    use std::f64::consts::PI;

    use crate::spacial::{ki_round, Position};

    /// generate star points, starting with the point at the top of the star, alternating between outer and inner radius
    pub fn calculate_star_points(outer_radius: i64, inner_radius: i64, center: Position) -> Vec<Position> {
        let mut points = Vec::new();
        let angle_step = (2.0 * PI) / 10.0; // 36 degrees in radians

        for i in 0..10 {
            let radius = (if i % 2 == 0 { outer_radius } else { inner_radius }) as f64;
            let angle = angle_step * i as f64 - PI / 2.0;

            // Y axis points down, so the top of the star has the smallest Y
            let x = center.x + ki_round(radius * angle.cos());
            let y = center.y + ki_round(radius * angle.sin());

            points.push(Position::new(x, y));
        }
        points
    }

}
