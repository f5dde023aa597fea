/// Row-major flat raster over the surface, one cell per pixel.
#[derive(Clone, Debug)]
pub struct Raster<T> {
    pub data: Vec<T>,
    pub w: usize,
    pub h: usize,
}

impl<T: Copy + Default> Raster<T> {
    /// # Panics
    ///
    /// If `w * h` overflows `usize`. Sizes from `Params::surface_size` never do.
    pub fn new(w: usize, h: usize) -> Self {
        let Some(len) = w.checked_mul(h) else {
            panic!("{w} x {h} raster overflows usize");
        };
        Self {
            data: vec![T::default(); len],
            w,
            h,
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.w && y < self.h);
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: T) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Pixel containing surface point (x, y); edge coordinates fold into the
    /// last row/column. None if outside.
    #[inline]
    pub fn pixel_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if self.w == 0 || self.h == 0 || x < 0.0 || y < 0.0 {
            return None;
        }
        let px = x.floor() as usize;
        let py = y.floor() as usize;
        if px > self.w || py > self.h {
            return None;
        }
        Some((px.min(self.w - 1), py.min(self.h - 1)))
    }
}

/// Pixels within `radius` of (cx, cy), clipped to a `w` x `h` raster.
pub fn disc_pixels(cx: f64, cy: f64, radius: f64, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    let r = radius.max(0.0);
    let x0 = (cx - r).floor().max(0.0) as usize;
    let y0 = (cy - r).floor().max(0.0) as usize;
    let x1 = ((cx + r).ceil().max(0.0) as usize).min(w.saturating_sub(1));
    let y1 = ((cy + r).ceil().max(0.0) as usize).min(h.saturating_sub(1));
    let r2 = r * r;
    (y0..=y1)
        .flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
        .filter(move |&(x, y)| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            dx * dx + dy * dy <= r2
        })
        .filter(move |_| w > 0 && h > 0)
}
