use nanorand::{Rng, WyRand};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// 积分图上 [x, x + width) x [y, y + height) 区域是否全空
pub fn region_is_empty(
    table: &[u32],
    table_width: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> bool {
    let at = |x: usize, y: usize| table[y * table_width + x] as i64;

    let right = x + width - 1;
    let bottom = y + height - 1;

    let br = at(right, bottom);
    let tr = if y > 0 { at(right, y - 1) } else { 0 };
    let bl = if x > 0 { at(x - 1, bottom) } else { 0 };
    let tl = if x > 0 && y > 0 { at(x - 1, y - 1) } else { 0 };

    br - tr - bl + tl == 0
}

/// 在图片寻找位置写字
pub fn find_space_for_rect(
    table: &[u32],
    table_width: u32,
    table_height: u32,
    rect: &Rect,
    rng: &mut WyRand,
) -> Option<Point> {
    if rect.width == 0 || rect.height == 0 {
        return None;
    }
    if rect.width > table_width || rect.height > table_height {
        return None;
    }

    let max_x = table_width - rect.width;
    let max_y = table_height - rect.height;

    let mut available_points: u32 = 0;
    let mut random_point = None;

    for y in 0..=max_y {
        for x in 0..=max_x {
            let empty = region_is_empty(
                table,
                table_width as usize,
                x as usize,
                y as usize,
                rect.width as usize,
                rect.height as usize,
            );
            if empty {
                // 蓄水池抽样, 每个空位概率相同
                let random_num = rng.generate_range(0..=available_points);
                if random_num == available_points {
                    random_point = Some(Point { x, y });
                }
                available_points += 1;
            }
        }
    }

    random_point
}

/// https://blog.demofox.org/2018/04/16/prefix-sums-and-summed-area-tables/
///
/// 从 start_row 开始往下重算积分图, start_row 以上的行必须已经是对的
pub fn to_summed_area_table(table: &mut [u32], values: &[u8], width: usize, start_row: usize) {
    let mut prev_row = if start_row > 0 {
        table[(start_row - 1) * width..start_row * width].to_vec()
    } else {
        vec![0; width]
    };

    table
        .chunks_exact_mut(width)
        .zip(values.chunks_exact(width))
        .skip(start_row)
        .for_each(|(row, raw)| {
            let mut sum = 0;
            row.iter_mut()
                .zip(raw.iter())
                .zip(prev_row.iter())
                .for_each(|((el, value), prev_row_el)| {
                    sum += *value as u32;
                    *el = sum + prev_row_el;
                });

            prev_row.clone_from_slice(row)
        });
}

#[cfg(test)]
mod tests {
    use nanorand::WyRand;

    use super::{find_space_for_rect, region_is_empty, to_summed_area_table, Point, Rect};

    fn table_for(values: &[u8], width: usize) -> Vec<u32> {
        let mut table = vec![0; values.len()];
        to_summed_area_table(&mut table, values, width, 0);
        table
    }

    #[test]
    fn summed_area_values() {
        #[rustfmt::skip]
        let values = [
            1, 0, 1,
            0, 1, 0,
        ];
        let table = table_for(&values, 3);
        assert_eq!(table, vec![1, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn partial_rebuild_matches_full() {
        let mut values = vec![0u8; 16];
        let mut table = table_for(&values, 4);

        values[2 * 4 + 1] = 1;
        values[3 * 4 + 3] = 1;
        to_summed_area_table(&mut table, &values, 4, 2);

        assert_eq!(table, table_for(&values, 4));
    }

    #[test]
    fn region_queries() {
        #[rustfmt::skip]
        let values = [
            0, 0, 0, 0,
            0, 0, 1, 0,
            0, 0, 0, 0,
        ];
        let table = table_for(&values, 4);

        assert!(region_is_empty(&table, 4, 0, 0, 2, 3));
        assert!(region_is_empty(&table, 4, 0, 0, 4, 1));
        assert!(!region_is_empty(&table, 4, 2, 1, 1, 1));
        assert!(!region_is_empty(&table, 4, 1, 0, 2, 2));
        assert!(region_is_empty(&table, 4, 3, 0, 1, 3));
    }

    #[test]
    fn finds_only_free_space() {
        #[rustfmt::skip]
        let values = [
            1, 1, 1,
            1, 0, 0,
            1, 0, 0,
        ];
        let table = table_for(&values, 3);
        let mut rng = WyRand::new_seed(7);

        let rect = Rect { width: 2, height: 2 };
        assert_eq!(
            find_space_for_rect(&table, 3, 3, &rect, &mut rng),
            Some(Point { x: 1, y: 1 })
        );

        let too_big = Rect { width: 3, height: 2 };
        assert_eq!(find_space_for_rect(&table, 3, 3, &too_big, &mut rng), None);

        let oversized = Rect { width: 4, height: 1 };
        assert_eq!(find_space_for_rect(&table, 3, 3, &oversized, &mut rng), None);
    }
}
