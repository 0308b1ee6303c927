/*
Copyright 2021 Jakub Lewandowski

This file is part of MOM6 Tools (m6tools).

MOM6 Tools (m6tools) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

MOM6 Tools (m6tools) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with MOM6 Tools (m6tools). If not, see https://www.gnu.org/licenses/.
*/

//! Module responsible for classification of ocean points
//! into named basins.
//!
//! Basins are peeled off the global wet mask one by one.
//! For each basin the remaining wet points are cut with
//! a combination of half-planes ([`south_of`]) and flooded
//! from a seed point inside the basin. Flooded points receive
//! the basin code and are removed from the wet mask, so that
//! later (larger) basins cannot leak into earlier ones.
//!
//! Coordinates are expected in the MOM6 convention with
//! longitudes spanning `-300..60`, which is why some cut lines
//! use longitudes below `-180`.

use super::flood::ice9_from_coord;
use crate::Float;
use log::{debug, warn};
use ndarray::{Array2, ArrayView2, Zip};

type Point = (Float, Float);

/// Codes of named ocean basins.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(i32)]
pub enum BasinCode {
    Unassigned = -9,
    Land = 0,
    SouthernOcean = 1,
    AtlanticOcean = 2,
    PacificOcean = 3,
    ArcticOcean = 4,
    IndianOcean = 5,
    MediterraneanSea = 6,
    BlackSea = 7,
    HudsonBay = 8,
    BalticSea = 9,
    RedSea = 10,
    PersianGulf = 11,
}

impl BasinCode {
    pub const NAMED: [BasinCode; 11] = [
        BasinCode::SouthernOcean,
        BasinCode::AtlanticOcean,
        BasinCode::PacificOcean,
        BasinCode::ArcticOcean,
        BasinCode::IndianOcean,
        BasinCode::MediterraneanSea,
        BasinCode::BlackSea,
        BasinCode::HudsonBay,
        BasinCode::BalticSea,
        BasinCode::RedSea,
        BasinCode::PersianGulf,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    /// CF flag meaning of the code.
    pub fn meaning(self) -> &'static str {
        match self {
            BasinCode::Unassigned => "unassigned_ocean",
            BasinCode::Land => "global_land",
            BasinCode::SouthernOcean => "southern_ocean",
            BasinCode::AtlanticOcean => "atlantic_ocean",
            BasinCode::PacificOcean => "pacific_ocean",
            BasinCode::ArcticOcean => "arctic_ocean",
            BasinCode::IndianOcean => "indian_ocean",
            BasinCode::MediterraneanSea => "mediterranean_sea",
            BasinCode::BlackSea => "black_sea",
            BasinCode::HudsonBay => "hudson_bay",
            BasinCode::BalticSea => "baltic_sea",
            BasinCode::RedSea => "red_sea",
            BasinCode::PersianGulf => "persian_gulf",
        }
    }

    /// Value of `flag_values` attribute for the basin variable.
    pub fn flag_values() -> String {
        std::iter::once(BasinCode::Land)
            .chain(BasinCode::NAMED)
            .map(|b| b.code().to_string())
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Value of `flag_meanings` attribute for the basin variable.
    pub fn flag_meanings() -> String {
        std::iter::once(BasinCode::Land)
            .chain(BasinCode::NAMED)
            .map(BasinCode::meaning)
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

/// Returns 1 for points on or to the right (south/east) of the directed
/// line passing through `xy0` and `xy1`, 0 otherwise.
pub fn south_of(x: ArrayView2<Float>, y: ArrayView2<Float>, xy0: Point, xy1: Point) -> Array2<Float> {
    let (x0, y0) = xy0;
    let dx = xy1.0 - x0;
    let dy = xy1.1 - y0;

    let mut result = Array2::<Float>::zeros(x.dim());

    Zip::from(&mut result)
        .and(&x)
        .and(&y)
        .for_each(|r, &xv, &yv| {
            if (xv - x0) * dy - (yv - y0) * dx >= 0.0 {
                *r = 1.0;
            }
        });

    result
}

/// Generates basin codes for every point of the grid
/// from cell centre coordinates and ocean depth.
///
/// Land keeps code 0. Wet points not reached by any of the basin
/// floods are marked as [`BasinCode::Unassigned`] and reported.
pub fn gen_basin_masks(
    x: ArrayView2<Float>,
    y: ArrayView2<Float>,
    depth: ArrayView2<Float>,
) -> Array2<i32> {
    let so = |xy0: Point, xy1: Point| south_of(x, y, xy0, xy1);
    let flood = |source: &Array2<Float>, seed: Point| ice9_from_coord(x, y, source.view(), seed);

    debug!("Generating global wet mask");
    // all ocean points seeded from South Atlantic
    let mut wet = flood(&depth.to_owned(), (0.0, -35.0));
    let mut code = Array2::<i32>::zeros(x.dim());

    debug!("Finding Cape of Good Hope");
    let mut land = 1.0 - &wet;
    Zip::from(&mut land).and(&x).for_each(|l, &xv| {
        if xv < -30.0 {
            *l = 0.0;
        }
    });
    let y_cgh = weighted_min(&flood(&land, (20.0, -30.0)), y);
    debug!("Cape of Good Hope latitude: {:.2}", y_cgh);

    debug!("Finding Melbourne");
    let mut land = 1.0 - &wet;
    Zip::from(&mut land).and(&x).for_each(|l, &xv| {
        if xv > -180.0 {
            *l = 0.0;
        }
    });
    let y_mel = weighted_min(&flood(&land, (-220.0, -25.0)), y);
    debug!("Melbourne latitude: {:.2}", y_mel);

    let mut peel = |basin: BasinCode, cut: Array2<Float>, seed: Point, wet: &mut Array2<Float>| {
        debug!("Processing {}", basin.meaning());
        let source = &*wet * &cut;
        let basin_points = flood(&source, seed);

        Zip::from(&mut code).and(&basin_points).for_each(|c, &b| {
            if b > 0.0 {
                *c = basin.code();
            }
        });

        *wet -= &basin_points;
    };

    peel(
        BasinCode::PersianGulf,
        1.0 - so((55.0, 23.0), (56.5, 27.0)),
        (53.0, 25.0),
        &mut wet,
    );

    peel(
        BasinCode::RedSea,
        1.0 - so((40.0, 11.0), (45.0, 13.0)),
        (40.0, 18.0),
        &mut wet,
    );

    peel(
        BasinCode::BlackSea,
        1.0 - so((26.0, 42.0), (32.0, 40.0)),
        (32.0, 43.0),
        &mut wet,
    );

    peel(
        BasinCode::MediterraneanSea,
        so((-5.7, 35.5), (-5.7, 36.5)),
        (4.0, 38.0),
        &mut wet,
    );

    peel(
        BasinCode::BalticSea,
        so((8.6, 56.0), (8.6, 60.0)),
        (10.0, 58.0),
        &mut wet,
    );

    let hudson_cut = (1.0
        - (1.0 - so((-95.0, 66.0), (-83.5, 67.5))) * (1.0 - so((-83.5, 67.5), (-84.0, 71.0))))
        * (1.0 - so((-70.0, 58.0), (-70.0, 65.0)));
    peel(BasinCode::HudsonBay, hudson_cut, (-85.0, 60.0), &mut wet);

    let labrador_sea = (1.0 - so((-171.0, 66.0), (-166.0, 65.5))) * (1.0 - so((-64.0, 66.4), (-50.0, 68.5)));
    let denmark_strait = so((-50.0, 0.0), (-50.0, 90.0)) * (1.0 - so((0.0, 65.5), (360.0, 65.5)));
    let iceland_sweden = so((-18.0, 0.0), (-18.0, 65.0)) * (1.0 - so((0.0, 64.9), (360.0, 64.9)));
    let barents_sea = so((20.0, 0.0), (20.0, 90.0));
    let bering_side = 1.0 - so((-280.0, 55.0), (-200.0, 65.0));
    let arctic_cut = labrador_sea + denmark_strait + iceland_sweden + barents_sea + bering_side;
    peel(BasinCode::ArcticOcean, arctic_cut, (0.0, 85.0), &mut wet);

    // the Indonesian passages are removed from the Pacific
    let pacific_cut = (1.0 - so((0.0, y_mel), (360.0, y_mel)))
        - so((-257.0, 1.0), (-257.0, 0.0)) * so((0.0, 3.0), (1.0, 3.0))
        - so((-254.25, 1.0), (-254.25, 0.0)) * so((0.0, -5.0), (1.0, -5.0))
        - so((-243.7, 1.0), (-243.7, 0.0)) * so((0.0, -8.4), (1.0, -8.4))
        - so((-234.5, 1.0), (-234.5, 0.0)) * so((0.0, -8.9), (1.0, -8.9));
    peel(BasinCode::PacificOcean, pacific_cut, (-150.0, 0.0), &mut wet);

    peel(
        BasinCode::AtlanticOcean,
        1.0 - so((0.0, y_cgh), (360.0, y_cgh)),
        (-20.0, 0.0),
        &mut wet,
    );

    peel(
        BasinCode::IndianOcean,
        1.0 - so((0.0, y_cgh), (360.0, y_cgh)),
        (55.0, 0.0),
        &mut wet,
    );

    peel(
        BasinCode::SouthernOcean,
        Array2::ones(x.dim()),
        (0.0, -55.0),
        &mut wet,
    );

    let mut leftovers = 0;
    for ((idx, c), &w) in code.indexed_iter_mut().zip(wet.iter()) {
        if w > 0.0 {
            *c = BasinCode::Unassigned.code();
            leftovers += 1;
            debug!(
                "Unassigned point: lon={:.3} lat={:.3} [j={}, i={}]",
                x[idx], y[idx], idx.0, idx.1
            );
        }
    }

    if leftovers > 0 {
        warn!("There are {} leftover points unassigned to a basin code", leftovers);
    } else {
        debug!("All points assigned a basin code");
    }

    code
}

/// Minimum of `mask * field`, zeros of the mask included.
fn weighted_min(mask: &Array2<Float>, field: ArrayView2<Float>) -> Float {
    Zip::from(mask)
        .and(&field)
        .fold(Float::INFINITY, |acc, &m, &f| acc.min(m * f))
}

/// Mask of the Atlantic with the Arctic and marginal seas
/// used for Atlantic overturning and heat transport.
pub fn atlantic_arctic_mask(code: ArrayView2<i32>) -> Array2<Float> {
    select_codes(
        code,
        &[
            BasinCode::AtlanticOcean,
            BasinCode::ArcticOcean,
            BasinCode::MediterraneanSea,
            BasinCode::BlackSea,
            BasinCode::HudsonBay,
        ],
    )
}

/// Mask of the Indian and Pacific oceans.
pub fn indo_pacific_mask(code: ArrayView2<i32>) -> Array2<Float> {
    select_codes(code, &[BasinCode::PacificOcean, BasinCode::IndianOcean])
}

fn select_codes(code: ArrayView2<i32>, basins: &[BasinCode]) -> Array2<Float> {
    code.mapv(|c| {
        if basins.iter().any(|b| b.code() == c) {
            1.0
        } else {
            0.0
        }
    })
}

/// Mask for v-points (northern cell faces): a face is inside
/// only when the cells on both of its sides are.
/// The row above the last one wraps around to the first row.
pub fn staggered_v_mask(mask: ArrayView2<Float>) -> Array2<Float> {
    let nj = mask.nrows();

    Array2::from_shape_fn(mask.dim(), |(j, i)| {
        mask[[j, i]] * mask[[(j + 1) % nj, i]]
    })
}
