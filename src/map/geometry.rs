use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let (mut x, mut y) = (x0, y0);

    loop {
        canvas.set_pixel_signed(x, y);
        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Filled disc (point markers)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Circle outline one pixel thick (cluster halos, current location)
pub fn draw_ring(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    let inner = (radius - 1) * (radius - 1);
    let outer = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d = dx * dx + dy * dy;
            if d <= outer && d > inner {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        // Top dot row of every cell
        assert_eq!(canvas.row_to_string(0), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.row_to_string(0), "⡇");
        assert_eq!(canvas.row_to_string(1), "⡇");
    }

    #[test]
    fn test_ring_leaves_center_empty() {
        let mut canvas = BrailleCanvas::new(10, 5);
        draw_ring(&mut canvas, 10, 10, 4);
        // Center pixel (10,10) is cell (5,2), dot (0,2) -> bit 0x04
        let cell = canvas.glyph(5, 2).map(|c| c as u32 - 0x2800).unwrap_or(0);
        assert_eq!(cell & 0x04, 0);
        assert!(!canvas.is_blank());
    }

    #[test]
    fn test_circle_fills_center() {
        let mut canvas = BrailleCanvas::new(10, 5);
        draw_circle(&mut canvas, 10, 10, 2);
        let cell = canvas.glyph(5, 2).map(|c| c as u32 - 0x2800).unwrap_or(0);
        assert_ne!(cell & 0x04, 0);
    }
}
