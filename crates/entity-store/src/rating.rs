/// Computes a product rating from its review ratings.
///
/// The rating is the arithmetic mean, or 0 when there are no reviews.
pub fn average_rating<I>(ratings: I) -> f64
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0i64, 0u32), |(sum, count), r| (sum + i64::from(r), count + 1));

    if count == 0 {
        0.0
    } else {
        sum as f64 / f64::from(count)
    }
}
