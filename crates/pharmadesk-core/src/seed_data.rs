//! Static first-run data: a starter catalog with default pricing, one demo
//! medical store and one demo supplier.

pub struct SeedMedicine {
    pub name: &'static str,
    pub company: &'static str,
    pub medicine_type: &'static str,
    pub tags: &'static [&'static str],
    pub price: f64,
    pub discount: f64,
    pub sale_discount: f64,
    pub batch_no: &'static str,
}

pub struct SeedCounterparty {
    pub name: &'static str,
    pub address: &'static str,
    pub phone: &'static str,
}

pub const DEMO_STORE: SeedCounterparty = SeedCounterparty {
    name: "Demo Medical Store",
    address: "Shop 4, Main Bazaar",
    phone: "0300-0000000",
};

pub const DEMO_SUPPLIER: SeedCounterparty = SeedCounterparty {
    name: "Demo Pharma Distributors",
    address: "Plot 18, Industrial Area",
    phone: "0300-1111111",
};

pub const SEED_MEDICINES: &[SeedMedicine] = &[
    SeedMedicine {
        name: "Panadol 500mg",
        company: "GSK",
        medicine_type: "Tablet",
        tags: &["analgesic", "fever"],
        price: 35.0,
        discount: 10.0,
        sale_discount: 5.0,
        batch_no: "PN2401",
    },
    SeedMedicine {
        name: "Augmentin 625mg",
        company: "GSK",
        medicine_type: "Tablet",
        tags: &["antibiotic"],
        price: 520.0,
        discount: 12.0,
        sale_discount: 6.0,
        batch_no: "AG2312",
    },
    SeedMedicine {
        name: "Brufen 400mg",
        company: "Abbott",
        medicine_type: "Tablet",
        tags: &["analgesic", "anti-inflammatory"],
        price: 60.0,
        discount: 10.0,
        sale_discount: 5.0,
        batch_no: "BR2402",
    },
    SeedMedicine {
        name: "Flagyl 400mg",
        company: "Sanofi",
        medicine_type: "Tablet",
        tags: &["antibiotic", "antiprotozoal"],
        price: 85.0,
        discount: 8.0,
        sale_discount: 4.0,
        batch_no: "FL2311",
    },
    SeedMedicine {
        name: "Risek 20mg",
        company: "Getz Pharma",
        medicine_type: "Capsule",
        tags: &["antacid"],
        price: 240.0,
        discount: 15.0,
        sale_discount: 7.0,
        batch_no: "RS2403",
    },
    SeedMedicine {
        name: "Softin 10mg",
        company: "Hilton",
        medicine_type: "Tablet",
        tags: &["antihistamine", "allergy"],
        price: 150.0,
        discount: 10.0,
        sale_discount: 5.0,
        batch_no: "SF2401",
    },
    SeedMedicine {
        name: "Calpol Syrup",
        company: "GSK",
        medicine_type: "Syrup",
        tags: &["fever", "pediatric"],
        price: 110.0,
        discount: 10.0,
        sale_discount: 5.0,
        batch_no: "CP2309",
    },
    SeedMedicine {
        name: "Ventolin Inhaler",
        company: "GSK",
        medicine_type: "Inhaler",
        tags: &["asthma", "bronchodilator"],
        price: 480.0,
        discount: 8.0,
        sale_discount: 3.0,
        batch_no: "VT2402",
    },
    SeedMedicine {
        name: "Glucophage 500mg",
        company: "Merck",
        medicine_type: "Tablet",
        tags: &["diabetes"],
        price: 95.0,
        discount: 12.0,
        sale_discount: 6.0,
        batch_no: "GL2310",
    },
    SeedMedicine {
        name: "Ceftriaxone 1g",
        company: "Searle",
        medicine_type: "Injection",
        tags: &["antibiotic", "injectable"],
        price: 320.0,
        discount: 15.0,
        sale_discount: 8.0,
        batch_no: "CF2404",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize_name;
    use std::collections::HashSet;

    #[test]
    fn test_seed_names_are_unique_when_normalized() {
        let names: HashSet<String> = SEED_MEDICINES.iter().map(|m| normalize_name(m.name)).collect();
        assert_eq!(names.len(), SEED_MEDICINES.len());
    }
}
