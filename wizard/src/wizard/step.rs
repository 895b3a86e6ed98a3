/// The three wizard pages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Step {
    #[default]
    Connect,
    SelectCollection,
    ViewAnalytics,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Connect, Step::SelectCollection, Step::ViewAnalytics];

    pub fn number(self) -> u8 {
        match self {
            Step::Connect => 1,
            Step::SelectCollection => 2,
            Step::ViewAnalytics => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Step::Connect),
            2 => Some(Step::SelectCollection),
            3 => Some(Step::ViewAnalytics),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Connect => "Connect to Database",
            Step::SelectCollection => "Select a Table",
            Step::ViewAnalytics => "Customer Analytics",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip() {
        for step in Step::ALL {
            assert_eq!(Step::from_number(step.number()), Some(step));
        }
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::from_number(4), None);
    }
}
