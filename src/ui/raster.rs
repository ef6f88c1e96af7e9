use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use eframe::egui::{Color32, FontDefinitions};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size, Blend, Canvas,
};
use imageproc::rect::Rect;

use crate::color::REGION_GREY;
use crate::error::{MaskError, Result};

use super::scene::{Bounds, Scene, SEGMENT_WIDTH};

pub const IMAGE_WIDTH: u32 = 1200;
pub const IMAGE_HEIGHT: u32 = 800;

const MARGIN_LEFT: u32 = 90;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_TOP: u32 = 50;
const MARGIN_BOTTOM: u32 = 80;

/// Fraction of the data span left empty on each side of the plot area.
const PLOT_MARGIN: f64 = 0.05;

/// Proportional font shipped inside egui's default font set.
const FONT_NAME: &str = "Ubuntu-Light";
const TITLE_SIZE: f32 = 22.0;
const TEXT_SIZE: f32 = 16.0;
const LABEL_PAD: i32 = 3;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AXIS: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// `<input stem>.png`, next to the input file.
pub fn image_path(source: &Path) -> PathBuf {
    source.with_extension("png")
}

/// The font used for titles, labels and ticks.
pub fn plot_font() -> Result<FontArc> {
    let fonts = FontDefinitions::default();
    let data = fonts
        .font_data
        .get(FONT_NAME)
        .ok_or_else(|| MaskError::Render(format!("font {FONT_NAME} is not bundled")))?;
    FontArc::try_from_vec(data.font.to_vec())
        .map_err(|e| MaskError::Render(format!("font {FONT_NAME}: {e}")))
}

/// Rasterise `scene` and write it as a PNG.
pub fn save_png(scene: &Scene, path: &Path) -> Result<()> {
    let font = plot_font()?;
    let img = rasterize(scene, &font, IMAGE_WIDTH, IMAGE_HEIGHT);
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| MaskError::Render(format!("writing {}: {e}", path.display())))?;
    log::info!("Saved plot to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Data → pixel mapping
// ---------------------------------------------------------------------------

/// Linear map from data space into the plot area. Depth grows downward.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    bounds: Bounds,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Viewport {
    fn new(bounds: Bounds, width: u32, height: u32) -> Self {
        Viewport {
            bounds: bounds.with_margin(PLOT_MARGIN),
            left: MARGIN_LEFT as f64,
            right: width.saturating_sub(MARGIN_RIGHT) as f64,
            top: MARGIN_TOP as f64,
            bottom: height.saturating_sub(MARGIN_BOTTOM) as f64,
        }
    }

    fn x(&self, time: f64) -> i32 {
        let b = &self.bounds;
        let x = self.left + (time - b.time_min) / (b.time_max - b.time_min) * (self.right - self.left);
        x.round() as i32
    }

    fn y(&self, depth: f64) -> i32 {
        let b = &self.bounds;
        let y = self.top + (depth - b.depth_min) / (b.depth_max - b.depth_min) * (self.bottom - self.top);
        y.round() as i32
    }
}

/// Rectangle covering both corners inclusively; never zero-sized.
fn span(x0: i32, y0: i32, x1: i32, y1: i32) -> Rect {
    let (left, right) = (x0.min(x1), x0.max(x1));
    let (top, bottom) = (y0.min(y1), y0.max(y1));
    Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
}

// ---------------------------------------------------------------------------
// Rasteriser
// ---------------------------------------------------------------------------

pub fn rasterize(scene: &Scene, font: &FontArc, width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, WHITE);

    let title = PxScale::from(TITLE_SIZE);
    let (title_w, _) = text_size(title, font, &scene.title);
    draw_text_mut(
        &mut img,
        AXIS,
        (width as i32 - title_w as i32) / 2,
        12,
        title,
        font,
        &scene.title,
    );

    let Some(bounds) = scene.bounds() else {
        return img;
    };
    let vp = Viewport::new(bounds, width, height);

    let mask = rgba(scene.segment_color());
    let half = (SEGMENT_WIDTH / 2.0) as i32;
    for seg in &scene.segments {
        let x = vp.x(seg.time);
        let rect = span(x - half, vp.y(seg.start), x + half - 1, vp.y(seg.stop));
        draw_filled_rect_mut(&mut img, rect, mask);
    }

    for outline in &scene.outlines {
        let xs = outline.points.map(|[t, _]| vp.x(t));
        let ys = outline.points.map(|[_, d]| vp.y(d));
        let rect = span(
            xs.iter().copied().min().unwrap_or_default(),
            ys.iter().copied().min().unwrap_or_default(),
            xs.iter().copied().max().unwrap_or_default(),
            ys.iter().copied().max().unwrap_or_default(),
        );
        draw_hollow_rect_mut(&mut img, rect, rgba(outline.color));
    }

    draw_axes(&mut img, font, &vp, scene);

    // Labels sit on a half-transparent box, so draw them through a blending canvas.
    let mut canvas = Blend(img);
    for outline in &scene.outlines {
        let x = vp.x(outline.label.time);
        let y = vp.y(outline.label.depth);
        draw_label(&mut canvas, font, x, y, &outline.label.text);
    }
    canvas.0
}

fn rgba(c: Color32) -> Rgba<u8> {
    Rgba([c.r(), c.g(), c.b(), c.a()])
}

/// Draw `text` line by line with its top-left corner at `(x, y)`.
fn draw_lines<C>(canvas: &mut C, font: &FontArc, x: i32, y: i32, text: &str)
where
    C: Canvas<Pixel = Rgba<u8>>,
{
    let scale = PxScale::from(TEXT_SIZE);
    let line_height = TEXT_SIZE.ceil() as i32 + 2;
    for (i, line) in text.lines().enumerate() {
        draw_text_mut(canvas, AXIS, x, y + i as i32 * line_height, scale, font, line);
    }
}

/// Width and height of a possibly multi-line `text`.
fn measure(font: &FontArc, text: &str) -> (i32, i32) {
    let scale = PxScale::from(TEXT_SIZE);
    let line_height = TEXT_SIZE.ceil() as i32 + 2;
    let width = text
        .lines()
        .map(|line| text_size(scale, font, line).0 as i32)
        .max()
        .unwrap_or(0);
    (width, text.lines().count() as i32 * line_height)
}

/// Text on a half-transparent grey box whose lower-left corner is `(x, y)`.
fn draw_label(canvas: &mut Blend<RgbaImage>, font: &FontArc, x: i32, y: i32, text: &str) {
    let (w, h) = measure(font, text);
    let top = y - h - 2 * LABEL_PAD;
    let mut bg = rgba(REGION_GREY);
    bg.0[3] = 128;
    draw_filled_rect_mut(canvas, span(x, top, x + w + 2 * LABEL_PAD, y), bg);
    draw_lines(canvas, font, x + LABEL_PAD, top + LABEL_PAD, text);
}

fn draw_axes(img: &mut RgbaImage, font: &FontArc, vp: &Viewport, scene: &Scene) {
    let (l, r) = (vp.left.round() as i32, vp.right.round() as i32);
    let (t, b) = (vp.top.round() as i32, vp.bottom.round() as i32);
    draw_hollow_rect_mut(img, span(l, t, r, b), AXIS);

    let (_, text_h) = measure(font, "0");
    let bounds = vp.bounds;

    // Axis extremes as tick labels: depth top/bottom, time left/right.
    for (value, y) in [(bounds.depth_min, t), (bounds.depth_max, b - text_h)] {
        let text = format_tick(value);
        let (w, _) = measure(font, &text);
        draw_lines(img, font, l - 6 - w, y, &text);
    }
    let time_right = format_tick(bounds.time_max);
    let (w_right, _) = measure(font, &time_right);
    draw_lines(img, font, l, b + 6, &format_tick(bounds.time_min));
    draw_lines(img, font, r - w_right, b + 6, &time_right);

    let (x_label_w, _) = measure(font, &scene.x_label);
    draw_lines(img, font, (l + r - x_label_w) / 2, b + 8 + text_h, &scene.x_label);
    draw_lines(img, font, 4, t - text_h - 8, &scene.y_label);
}

fn format_tick(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::TypeColors;
    use crate::ui::scene::{Label, Outline, Segment};

    fn scene() -> Scene {
        Scene {
            title: "Using c= 1500 m/s".into(),
            x_label: "Time\n(ms)".into(),
            y_label: "Depth (m)".into(),
            segments: vec![Segment {
                region_id: 1,
                time: 50.0,
                start: 20.0,
                stop: 80.0,
            }],
            outlines: vec![Outline {
                region_id: 1,
                type_name: "TRACKING".into(),
                points: [[0.0, 100.0], [100.0, 100.0], [100.0, 0.0], [0.0, 0.0], [0.0, 100.0]],
                color: Color32::from_rgb(200, 0, 0),
                label: Label {
                    time: 0.0,
                    depth: 0.0,
                    text: "ID: 1 (TRACKING)".into(),
                },
            }],
            colors: TypeColors::default(),
        }
    }

    fn render(scene: &Scene, width: u32, height: u32) -> RgbaImage {
        rasterize(scene, &plot_font().unwrap(), width, height)
    }

    #[test]
    fn segments_are_drawn_with_depth_increasing_downward() {
        let img = render(&scene(), 400, 300);
        let vp = Viewport::new(scene().bounds().unwrap(), 400, 300);
        let x = vp.x(50.0) as u32;

        // Inside the segment: black.
        assert_eq!(img.get_pixel(x, vp.y(50.0) as u32).0, [0, 0, 0, 255]);
        // Shallower than the segment start: background.
        assert_eq!(img.get_pixel(x, vp.y(10.0) as u32).0, [255, 255, 255, 255]);
        assert!(vp.y(80.0) > vp.y(20.0));
    }

    #[test]
    fn outline_edges_use_region_colour() {
        let img = render(&scene(), 400, 300);
        let vp = Viewport::new(scene().bounds().unwrap(), 400, 300);
        let (x, y) = (vp.x(75.0) as u32, vp.y(100.0) as u32);
        assert_eq!(img.get_pixel(x, y).0, [200, 0, 0, 255]);
    }

    #[test]
    fn label_box_is_blended_over_the_background() {
        let img = render(&scene(), 400, 300);
        let vp = Viewport::new(scene().bounds().unwrap(), 400, 300);
        // Just above the anchor and right of the outline edge: grey box over white.
        let px = img.get_pixel(vp.x(0.0) as u32 + 1, vp.y(0.0) as u32 - 1).0;
        assert!(px[0] < 255 && px[0] > 128, "{px:?}");
        assert_eq!(px[3], 255);
    }

    #[test]
    fn title_text_is_rendered() {
        let img = render(&scene(), 400, 300);
        let inked = (0..400)
            .flat_map(|x| (10..40).map(move |y| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0 != [255, 255, 255, 255])
            .count();
        assert!(inked > 20, "only {inked} title pixels");
    }

    #[test]
    fn empty_scene_still_renders_a_canvas() {
        let mut empty = scene();
        empty.segments.clear();
        empty.outlines.clear();
        let img = render(&empty, 200, 100);
        assert_eq!(img.dimensions(), (200, 100));
    }

    #[test]
    fn zero_height_segment_still_covers_a_pixel() {
        let rect = span(10, 20, 10, 20);
        assert_eq!((rect.width(), rect.height()), (1, 1));
        let rect = span(5, 40, 8, 30);
        assert_eq!((rect.left(), rect.top(), rect.bottom()), (5, 30, 40));
    }

    #[test]
    fn writes_png_beside_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = image_path(&dir.path().join("demo_mask.nc"));
        assert_eq!(path.file_name().unwrap(), "demo_mask.png");
        save_png(&scene(), &path).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.to_rgba8().width(), IMAGE_WIDTH);
    }

    #[test]
    fn ticks_print_integers_without_decimals() {
        assert_eq!(format_tick(100000.0), "100000");
        assert_eq!(format_tick(12.34), "12.3");
    }
}
