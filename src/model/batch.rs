use super::quote::Quote;

/// One configured symbol and the quote its fetch produced, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSlot {
    pub symbol: String,
    pub quote: Option<Quote>,
}

/// Result of one refresh cycle: a slot per configured symbol, in configured
/// order. A failed fetch leaves its slot empty rather than stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    slots: Vec<BatchSlot>,
}

impl Batch {
    pub fn from_slots(slots: Vec<BatchSlot>) -> Self {
        Self { slots }
    }

    /// Batch where every slot is filled, slot symbols taken from the quotes.
    pub fn from_quotes(quotes: Vec<Quote>) -> Self {
        let slots = quotes
            .into_iter()
            .map(|quote| BatchSlot {
                symbol: quote.symbol().to_string(),
                quote: Some(quote),
            })
            .collect();
        Self { slots }
    }

    pub fn slots(&self) -> &[BatchSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fetched quotes in batch order, invalid ones included.
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> + Clone {
        self.slots.iter().filter_map(|slot| slot.quote.as_ref())
    }

    pub fn valid_quotes(&self) -> impl Iterator<Item = &Quote> + Clone {
        self.quotes().filter(|quote| quote.is_valid())
    }

    pub fn succeeded(&self) -> usize {
        self.quotes().count()
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| slot.quote.is_none())
            .map(|slot| slot.symbol.as_str())
            .collect()
    }
}
