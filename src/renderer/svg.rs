//! SVG generation for layout snapshots

use crate::layout::{Assets, BoundingBox, Point};
use crate::stylesheet::Palette;

use super::SvgConfig;

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_str(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    styles: Vec<String>,
    elements: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    /// Create a new SVG builder
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            styles: vec![],
            elements: vec![],
            indent: 1,
        }
    }

    pub fn config(&self) -> &SvgConfig {
        &self.config
    }

    /// Add CSS custom properties and class rules from a palette
    pub fn add_palette(&mut self, palette: &Palette) {
        let prefix = self.prefix();
        let mut tokens: Vec<(&String, &String)> = palette.colors.iter().collect();
        tokens.sort();

        let mut css = String::from(":root {\n");
        for (token, value) in tokens {
            css.push_str(&format!("      --{}: {};\n", token, value));
        }
        css.push_str("    }\n");
        css.push_str(&format!(
            "    .{p}boundary {{ fill: {}; stroke: {}; stroke-width: 2; }}\n",
            palette.resolve_or_default("boundary-fill"),
            palette.resolve_or_default("boundary"),
            p = prefix
        ));
        css.push_str(&format!(
            "    .{p}asset {{ fill-opacity: 0.6; stroke: {}; }}\n",
            palette.resolve_or_default("boundary"),
            p = prefix
        ));
        css.push_str(&format!(
            "    .{p}active {{ fill: {}; }}\n",
            palette.resolve_or_default("asset-active"),
            p = prefix
        ));
        css.push_str(&format!(
            "    .{p}frozen {{ fill: {}; }}\n",
            palette.resolve_or_default("asset-frozen"),
            p = prefix
        ));
        css.push_str(&format!(
            "    .{p}label {{ fill: {}; font-family: sans-serif; font-size: 12px; }}",
            palette.resolve_or_default("label"),
            p = prefix
        ));
        self.styles.push(css);
    }

    pub(crate) fn prefix(&self) -> String {
        self.config.class_prefix.clone().unwrap_or_default()
    }

    fn indent_str(&self) -> String {
        if self.config.pretty_print {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    fn class_list(&self, base: &str, classes: &[String]) -> String {
        let prefix = self.prefix();
        std::iter::once(format!("{}{}", prefix, base))
            .chain(classes.iter().map(|c| format!("{}{}", prefix, c)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Add a polygon element
    pub fn add_polygon(
        &mut self,
        id: Option<&str>,
        points: &[Point],
        base: &str,
        classes: &[String],
        styles: &str,
    ) {
        let id_attr = id
            .map(|i| format!(r#" id="{}""#, escape_xml(i)))
            .unwrap_or_default();

        self.elements.push(format!(
            r#"{}<polygon{} class="{}" points="{}"{}/>"#,
            self.indent_str(),
            id_attr,
            self.class_list(base, classes),
            points_attr(points),
            styles
        ));
    }

    /// Add an open polyline
    pub fn add_polyline(&mut self, points: &[Point], base: &str, styles: &str) {
        self.elements.push(format!(
            r#"{}<polyline class="{}" points="{}" fill="none"{}/>"#,
            self.indent_str(),
            self.class_list(base, &[]),
            points_attr(points),
            styles
        ));
    }

    /// Add a line element
    pub fn add_line(&mut self, from: Point, to: Point, base: &str, styles: &str) {
        self.elements.push(format!(
            r#"{}<line class="{}" x1="{}" y1="{}" x2="{}" y2="{}"{}/>"#,
            self.indent_str(),
            self.class_list(base, &[]),
            from.x,
            from.y,
            to.x,
            to.y,
            styles
        ));
    }

    /// Add a text label
    pub fn add_text(&mut self, text: &str, at: Point, anchor: TextAnchor, styles: &str) {
        let prefix = self.prefix();
        self.elements.push(format!(
            r#"{}<text class="{}label" x="{}" y="{}" text-anchor="{}" dominant-baseline="middle"{}>{}</text>"#,
            self.indent_str(),
            prefix,
            at.x,
            at.y,
            anchor.as_str(),
            styles,
            escape_xml(text)
        ));
    }

    /// Add a group element with optional ID and classes
    pub fn start_group(&mut self, id: Option<&str>, classes: &[String]) {
        let id_attr = id
            .map(|i| format!(r#" id="{}""#, escape_xml(i)))
            .unwrap_or_default();
        let class_attr = if classes.is_empty() {
            String::new()
        } else {
            let prefix = self.prefix();
            let names: Vec<String> = classes.iter().map(|c| format!("{prefix}{c}")).collect();
            format!(r#" class="{}""#, names.join(" "))
        };

        self.elements
            .push(format!("{}<g{}{}>", self.indent_str(), id_attr, class_attr));
        self.indent += 1;
    }

    /// Close a group element
    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Build the final SVG string
    pub fn build(self, viewbox: BoundingBox) -> String {
        let padding = self.config.viewbox_padding;
        let vb_x = viewbox.x - padding;
        let vb_y = viewbox.y - padding;
        let vb_w = viewbox.width + 2.0 * padding;
        let vb_h = viewbox.height + 2.0 * padding;

        let nl = self.newline();

        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            vb_x, vb_y, vb_w, vb_h
        ));
        svg.push_str(nl);

        if !self.styles.is_empty() {
            svg.push_str("  <style>");
            svg.push_str(nl);
            for style in &self.styles {
                svg.push_str("    ");
                svg.push_str(style);
                svg.push_str(nl);
            }
            svg.push_str("  </style>");
            svg.push_str(nl);
        }

        for elem in &self.elements {
            svg.push_str(elem);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");

        svg
    }
}

/// Map room coordinates (meters, y up) to SVG user units (pixels, y down)
pub(crate) fn to_svg(point: Point, scale: f64) -> Point {
    Point::new(point.x * scale, -point.y * scale)
}

/// Render the room outline and every asset footprint.
///
/// Optimize-enabled assets get the `active` class, the rest `frozen`. Assets
/// whose pose is not finite are left out of the picture.
pub fn render_layout(
    boundary: &[Point],
    assets: &Assets,
    config: &SvgConfig,
    palette: &Palette,
) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    builder.add_palette(palette);

    let scale = config.scale;
    let mut drawn: Vec<Point> = Vec::new();

    let room: Vec<Point> = boundary.iter().map(|p| to_svg(*p, scale)).collect();
    if room.len() >= 3 {
        builder.add_polygon(Some("room"), &room, "boundary", &[], "");
        drawn.extend(&room);
    }

    builder.start_group(Some("assets"), &[]);
    for (id, asset) in assets {
        let points = asset.footprint_points();
        if points.iter().any(|p| !p.is_finite()) {
            continue;
        }
        let outline: Vec<Point> = points.iter().map(|p| to_svg(*p, scale)).collect();
        let state = if asset.optimize { "active" } else { "frozen" };
        builder.add_polygon(Some(id), &outline, "asset", &[state.to_string()], "");
        builder.add_text(id, to_svg(asset.center(), scale), TextAnchor::Middle, "");
        drawn.extend(&outline);
    }
    builder.end_group();

    let viewbox =
        BoundingBox::from_points(&drawn).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));
    builder.build(viewbox)
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Asset, Shape};
    use insta::assert_snapshot;

    fn compact() -> SvgConfig {
        SvgConfig::default()
            .with_standalone(false)
            .with_pretty_print(false)
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b"), "a &lt; b");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
    }

    #[test]
    fn test_y_axis_is_flipped() {
        assert_eq!(to_svg(Point::new(1.0, 2.0), 10.0), Point::new(10.0, -20.0));
    }

    #[test]
    fn test_polygon_markup() {
        let mut builder = SvgBuilder::new(compact());
        builder.add_polygon(
            Some("bed"),
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 5.0),
            ],
            "asset",
            &["active".to_string()],
            "",
        );
        assert_snapshot!(
            builder.build(BoundingBox::new(0.0, 0.0, 10.0, 5.0)),
            @r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-20 -20 50 45"><polygon id="bed" class="lr-asset lr-active" points="0,0 10,0 10,5"/></svg>"#
        );
    }

    #[test]
    fn test_render_layout_classes_assets() {
        let mut assets = Assets::new();
        let shape = Shape::Box {
            width: 1.0,
            depth: 1.0,
        };
        assets.insert(
            "bed".to_string(),
            Asset::new("bed", shape.clone(), vec![1.0, 1.0], 0.0),
        );
        assets.insert(
            "desk".to_string(),
            Asset::new("desk", shape, vec![3.0, 1.0], 0.0).with_optimize(false),
        );
        let boundary = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(0.0, 2.0),
        ];

        let svg = render_layout(&boundary, &assets, &SvgConfig::default(), &Palette::default());
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"id="room" class="lr-boundary""#));
        assert!(svg.contains(r#"id="bed" class="lr-asset lr-active""#));
        assert!(svg.contains(r#"id="desk" class="lr-asset lr-frozen""#));
        assert!(svg.contains(r#"viewBox="-20 -220 440 240""#));
    }

    #[test]
    fn test_render_layout_skips_non_finite_assets() {
        let mut assets = Assets::new();
        let mut broken = Asset::new(
            "broken",
            Shape::Box {
                width: 1.0,
                depth: 1.0,
            },
            vec![0.0, 0.0],
            0.0,
        );
        broken.position.values_mut()[1] = f64::INFINITY;
        assets.insert("broken".to_string(), broken);

        let svg = render_layout(&[], &assets, &compact(), &Palette::default());
        assert!(!svg.contains(r#"id="broken""#));
    }
}
