/// Index and score of the highest-scoring candidate. Ties keep the earliest
/// candidate, so selection over a fixed list is deterministic.
pub fn max_by_score<T, F>(items: &[T], score: F) -> Option<(usize, i32)>
where
    F: Fn(&T) -> i32,
{
    let mut best: Option<(usize, i32)> = None;
    for (idx, item) in items.iter().enumerate() {
        let s = score(item);
        match best {
            Some((_, top)) if s <= top => {}
            _ => best = Some((idx, s)),
        }
    }
    best
}
