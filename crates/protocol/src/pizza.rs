//! Pizza domain types: the closed enums and records that flow between
//! reception, the dispatcher and a kitchen.

/// One of the nine ingredient kinds a kitchen stocks.
///
/// `ordinal()` is the index into `WorkerStatus::ingredient_counts` and is
/// frozen as part of the wire format — do not reorder these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ingredient {
    /// Pizza base.
    Dough,
    /// Tomato sauce.
    Tomato,
    /// Gruyere cheese.
    Gruyere,
    /// Ham.
    Ham,
    /// Mushrooms.
    Mushrooms,
    /// Steak strips.
    Steak,
    /// Eggplant.
    Eggplant,
    /// Goat cheese.
    GoatCheese,
    /// The chief's secret ingredient.
    ChiefLove,
}

/// All nine ingredient kinds, in `ordinal()` order.
pub const ALL_INGREDIENTS: [Ingredient; 9] = [
    Ingredient::Dough,
    Ingredient::Tomato,
    Ingredient::Gruyere,
    Ingredient::Ham,
    Ingredient::Mushrooms,
    Ingredient::Steak,
    Ingredient::Eggplant,
    Ingredient::GoatCheese,
    Ingredient::ChiefLove,
];

impl Ingredient {
    /// Index into the fixed 9-slot ingredient arrays (stock counts, wire payloads).
    pub fn ordinal(self) -> usize {
        match self {
            Ingredient::Dough => 0,
            Ingredient::Tomato => 1,
            Ingredient::Gruyere => 2,
            Ingredient::Ham => 3,
            Ingredient::Mushrooms => 4,
            Ingredient::Steak => 5,
            Ingredient::Eggplant => 6,
            Ingredient::GoatCheese => 7,
            Ingredient::ChiefLove => 8,
        }
    }
}

/// The four pizzas on the menu.
///
/// The `bit_flag()` values are the wire ordinals fixed by the protocol; they
/// are powers of two so a set of pizza types can be packed into one byte
/// elsewhere without a new representation, so don't renumber them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PizzaType {
    /// Dough, tomato, gruyere.
    Margarita,
    /// Margarita plus ham and mushrooms.
    Regina,
    /// Dough, tomato, steak (no gruyere).
    Americana,
    /// Dough, tomato, eggplant, goat cheese, chief's love.
    Fantasia,
}

impl PizzaType {
    /// Wire ordinal (bit flag) for this type.
    pub fn bit_flag(self) -> u8 {
        match self {
            PizzaType::Margarita => 1,
            PizzaType::Regina => 2,
            PizzaType::Americana => 4,
            PizzaType::Fantasia => 8,
        }
    }

    /// Decode a wire ordinal back into a `PizzaType`.
    pub fn from_bit_flag(flag: u8) -> Option<Self> {
        match flag {
            1 => Some(PizzaType::Margarita),
            2 => Some(PizzaType::Regina),
            4 => Some(PizzaType::Americana),
            8 => Some(PizzaType::Fantasia),
            _ => None,
        }
    }

    /// Case-insensitive name as used in the order grammar.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "margarita" => Some(PizzaType::Margarita),
            "regina" => Some(PizzaType::Regina),
            "americana" => Some(PizzaType::Americana),
            "fantasia" => Some(PizzaType::Fantasia),
            _ => None,
        }
    }

    /// Base cook time in whole seconds, before the global multiplier is applied.
    pub fn base_cook_seconds(self) -> u64 {
        match self {
            PizzaType::Margarita => 1,
            PizzaType::Regina => 2,
            PizzaType::Americana => 2,
            PizzaType::Fantasia => 4,
        }
    }

    /// The fixed ingredient list consumed by one unit of this pizza.
    pub fn ingredients(self) -> &'static [Ingredient] {
        match self {
            PizzaType::Margarita => &[Ingredient::Dough, Ingredient::Tomato, Ingredient::Gruyere],
            PizzaType::Regina => &[
                Ingredient::Dough,
                Ingredient::Tomato,
                Ingredient::Gruyere,
                Ingredient::Ham,
                Ingredient::Mushrooms,
            ],
            PizzaType::Americana => &[Ingredient::Dough, Ingredient::Tomato, Ingredient::Steak],
            PizzaType::Fantasia => &[
                Ingredient::Dough,
                Ingredient::Tomato,
                Ingredient::Eggplant,
                Ingredient::GoatCheese,
                Ingredient::ChiefLove,
            ],
        }
    }
}

/// The five sizes an order can request. Recorded for display only — it has
/// no effect on cook time or ingredient consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PizzaSize {
    /// Small.
    S,
    /// Medium.
    M,
    /// Large.
    L,
    /// Extra large.
    XL,
    /// Double extra large.
    XXL,
}

impl PizzaSize {
    /// Wire ordinal (bit flag) for this size.
    pub fn bit_flag(self) -> u8 {
        match self {
            PizzaSize::S => 1,
            PizzaSize::M => 2,
            PizzaSize::L => 4,
            PizzaSize::XL => 8,
            PizzaSize::XXL => 16,
        }
    }

    /// Decode a wire ordinal back into a `PizzaSize`.
    pub fn from_bit_flag(flag: u8) -> Option<Self> {
        match flag {
            1 => Some(PizzaSize::S),
            2 => Some(PizzaSize::M),
            4 => Some(PizzaSize::L),
            8 => Some(PizzaSize::XL),
            16 => Some(PizzaSize::XXL),
            _ => None,
        }
    }

    /// Case-sensitive name as used in the order grammar (`S`, `M`, `L`, `XL`, `XXL`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "S" => Some(PizzaSize::S),
            "M" => Some(PizzaSize::M),
            "L" => Some(PizzaSize::L),
            "XL" => Some(PizzaSize::XL),
            "XXL" => Some(PizzaSize::XXL),
            _ => None,
        }
    }
}

/// A single pizza to cook, as handed from reception to the dispatcher and
/// from the dispatcher to a kitchen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PizzaJob {
    /// What's on it.
    pub pizza_type: PizzaType,
    /// How big (display only).
    pub size: PizzaSize,
    /// Cook time, fixed at dispatch time from the base time and the global multiplier.
    pub cook_time_ms: u64,
    /// Whether this job has been cooked; `false` until a kitchen reports completion.
    pub cooked: bool,
}

impl PizzaJob {
    /// Build a freshly dispatched (uncooked) job, computing `cook_time_ms`
    /// from the type's base cook time and the fleet-wide `multiplier`.
    pub fn new(pizza_type: PizzaType, size: PizzaSize, multiplier: f64) -> Self {
        let base_ms = pizza_type.base_cook_seconds() as f64 * 1000.0;
        let cook_time_ms = (base_ms * multiplier).round() as u64;
        Self { pizza_type, size, cook_time_ms, cooked: false }
    }

    /// Return a copy of this job marked cooked, as sent back in `COMPLETED:`.
    pub fn into_cooked(mut self) -> Self {
        self.cooked = true;
        self
    }
}

/// A point-in-time snapshot of one kitchen's load and stock, as reported in
/// response to `STATUS_REQUEST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatus {
    /// Monotonic worker id assigned at fork time.
    pub worker_id: u64,
    /// Cooks currently cooking (0..=total_cooks).
    pub active_cooks: u32,
    /// Size of this kitchen's thread pool.
    pub total_cooks: u32,
    /// Jobs sitting in the FIFO that haven't been picked up by a cook yet.
    pub queued_jobs: u32,
    /// `2 * total_cooks`; the admission ceiling for `queued_jobs + active_cooks`.
    pub max_capacity: u32,
    /// Current stock of each ingredient, indexed by `Ingredient::ordinal()`.
    pub ingredient_counts: [u32; 9],
}

impl WorkerStatus {
    /// A synthetic status used when a kitchen doesn't answer `STATUS_REQUEST`
    /// within the poll deadline (zero load, uniform stock of 5).
    pub fn synthetic_fallback(worker_id: u64, total_cooks: u32) -> Self {
        Self {
            worker_id,
            active_cooks: 0,
            total_cooks,
            queued_jobs: 0,
            max_capacity: total_cooks * 2,
            ingredient_counts: [5; 9],
        }
    }
}
