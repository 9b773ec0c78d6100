//! Per-worker ingredient stock: nine counters, replenished by a ticker
//! thread and consumed all-or-nothing by a cook task.

use std::sync::Mutex;

use plazza_protocol::Ingredient;

const INITIAL_COUNT: u32 = 5;
const RESTOCK_CEILING: u32 = 10;

/// Nine ingredient counters guarded by one mutex.
///
/// Checking stock and decrementing it for a job happen under the same lock
/// acquisition, so a cook never observes another cook's job as "affordable"
/// and then loses the race for the last unit.
pub struct Stock {
    counts: Mutex<[u32; 9]>,
}

impl Stock {
    /// A fresh stock, five units of every ingredient.
    pub fn new() -> Self {
        Self { counts: Mutex::new([INITIAL_COUNT; 9]) }
    }

    /// Try to consume one unit of every ingredient `recipe` needs.
    ///
    /// Either every ingredient is decremented, or none are: the first
    /// ingredient found at zero is returned as the reason the job can't be
    /// cooked, and the stock is left untouched.
    pub fn try_consume(&self, recipe: &[Ingredient]) -> Result<(), Ingredient> {
        let mut counts = self.counts.lock().expect("stock mutex poisoned");
        for ingredient in recipe {
            if counts[ingredient.ordinal()] == 0 {
                return Err(*ingredient);
            }
        }
        for ingredient in recipe {
            counts[ingredient.ordinal()] -= 1;
        }
        Ok(())
    }

    /// Increment every ingredient by one, capped at the restock ceiling.
    pub fn restock_tick(&self) {
        let mut counts = self.counts.lock().expect("stock mutex poisoned");
        for count in counts.iter_mut() {
            if *count < RESTOCK_CEILING {
                *count += 1;
            }
        }
    }

    /// A point-in-time copy of all nine counters, in `Ingredient::ordinal()` order.
    pub fn snapshot(&self) -> [u32; 9] {
        *self.counts.lock().expect("stock mutex poisoned")
    }
}

impl Default for Stock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plazza_protocol::PizzaType;

    #[test]
    fn consume_decrements_every_required_ingredient() {
        let stock = Stock::new();
        stock.try_consume(PizzaType::Margarita.ingredients()).unwrap();
        let snapshot = stock.snapshot();
        assert_eq!(snapshot[Ingredient::Dough.ordinal()], 4);
        assert_eq!(snapshot[Ingredient::Tomato.ordinal()], 4);
        assert_eq!(snapshot[Ingredient::Gruyere.ordinal()], 4);
        assert_eq!(snapshot[Ingredient::Ham.ordinal()], 5);
    }

    #[test]
    fn consume_is_all_or_nothing_when_short() {
        let stock = Stock::new();
        for _ in 0..5 {
            stock.try_consume(&[Ingredient::ChiefLove]).unwrap();
        }
        let result = stock.try_consume(PizzaType::Fantasia.ingredients());
        assert_eq!(result, Err(Ingredient::ChiefLove));
        // Dough and Tomato, which come before ChiefLove in the recipe, must
        // not have been decremented despite the later failure.
        let snapshot = stock.snapshot();
        assert_eq!(snapshot[Ingredient::Dough.ordinal()], 5);
        assert_eq!(snapshot[Ingredient::Tomato.ordinal()], 5);
    }

    #[test]
    fn restock_never_exceeds_ceiling() {
        let stock = Stock::new();
        for _ in 0..20 {
            stock.restock_tick();
        }
        assert!(stock.snapshot().iter().all(|&c| c == RESTOCK_CEILING));
    }
}
