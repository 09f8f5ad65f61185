use battleship_bridge::{BoardError, Orientation, Ship, ShipPlacement, ShipType};

#[test]
fn test_new_and_mask() -> Result<(), BoardError> {
    const N: usize = 5;
    let def = ShipType::new("Test", 3);
    let ship = Ship::<u32, N>::new(def, Orientation::Horizontal, 2, 1)?;
    for c in 1..4 {
        assert!(ship.mask().get(2, c)?);
    }
    assert_eq!(ship.mask().count_ones(), 3);
    assert_eq!(ship.origin(), (2, 1));
    Ok(())
}

#[test]
fn test_out_of_bounds() {
    let def = ShipType::new("Test", 4);
    let err = Ship::<u32, 5>::new(def, Orientation::Vertical, 2, 0).unwrap_err();
    assert_eq!(err, BoardError::ShipOutOfBounds);
}

#[test]
fn test_rotated_keeps_anchor() -> Result<(), BoardError> {
    let def = ShipType::new("Test", 2);
    let ship = Ship::<u32, 5>::new(def, Orientation::Horizontal, 1, 1)?;
    let turned = ship.rotated()?;
    assert_eq!(turned.orientation(), Orientation::Vertical);
    assert_eq!(turned.origin(), (1, 1));
    assert!(turned.mask().get(2, 1)?);
    Ok(())
}

#[test]
fn test_placement_round_trip_and_catalog_checks() -> Result<(), BoardError> {
    let placement = ShipPlacement {
        name: "Cruiser".to_string(),
        size: 3,
        row: 4,
        col: 2,
        horizontal: false,
    };
    let ship = Ship::<u128, 10>::from_placement(&placement)?;
    assert_eq!(ship.to_placement(), placement);

    let wrong_size = ShipPlacement { size: 4, ..placement.clone() };
    assert_eq!(
        Ship::<u128, 10>::from_placement(&wrong_size).unwrap_err(),
        BoardError::SizeMismatch
    );
    let unknown = ShipPlacement { name: "Dinghy".to_string(), ..placement };
    assert_eq!(
        Ship::<u128, 10>::from_placement(&unknown).unwrap_err(),
        BoardError::NameNotFound
    );
    Ok(())
}
