//! Pure dimension math for thumbnails. No I/O.

/// Scale `source` down so its longer edge is at most `max_edge`, keeping the
/// aspect ratio. Images already inside the box are returned unchanged; the
/// shorter edge never rounds below one pixel.
///
/// ```
/// # use mediashelf::imaging::fit_within;
/// assert_eq!(fit_within((1200, 800), 300), (300, 200));
/// assert_eq!(fit_within((200, 100), 300), (200, 100));
/// ```
pub fn fit_within(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = source;
    let long = w.max(h);
    if long <= max_edge || long == 0 {
        return source;
    }

    let scale = max_edge as f64 / long as f64;
    let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).max(1);

    if w >= h {
        (max_edge, scaled(h))
    } else {
        (scaled(w), max_edge)
    }
}
