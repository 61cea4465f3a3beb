use glam::Vec2;
use hamlet::{
    dwelling::House,
    settlement::{Settlement, SettlementSettings},
    villager::Gender,
    world::IdAllocator,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

proptest! {
    #[test]
    fn stock_stays_clamped_and_houses_never_shrink(
        capacity in 1u32..500,
        per_house in 1u32..60,
        deposits in proptest::collection::vec(0u32..400, 0..40),
        seed in any::<u64>(),
    ) {
        let mut ids = IdAllocator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut settlement = Settlement::new(
            ids.allocate(),
            SettlementSettings {
                capacity,
                resources_per_house: per_house,
                initial_houses: 0,
                ..SettlementSettings::default()
            },
        );
        let mut total: u64 = 0;
        let mut houses = 0;
        for amount in deposits {
            settlement.deposit(amount, &mut ids, &mut rng);
            total += u64::from(amount);
            prop_assert!(settlement.stock() <= capacity);
            prop_assert_eq!(u64::from(settlement.stock()), total.min(u64::from(capacity)));
            prop_assert!(settlement.houses().len() >= houses);
            prop_assert_eq!(settlement.houses().len(), settlement.expected_houses());
            houses = settlement.houses().len();
        }
    }

    #[test]
    fn houses_never_exceed_two_occupants(ops in proptest::collection::vec((0usize..5, any::<bool>(), any::<bool>()), 0..60)) {
        let mut ids = IdAllocator::default();
        let mut house = House::new(ids.allocate(), Vec2::ZERO);
        let villagers: Vec<_> = (0..5).map(|_| ids.allocate()).collect();
        for (who, join, male) in ops {
            let gender = if male { Gender::Male } else { Gender::Female };
            if join {
                house.join(villagers[who], gender);
            } else {
                house.leave(villagers[who]);
            }
            prop_assert!(house.occupants().len() <= House::CAPACITY);
            let mut seen: Vec<_> = house.occupants().iter().map(|o| o.id).collect();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), house.occupants().len());
        }
    }
}
