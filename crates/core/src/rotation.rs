/// Symmetries of a square board, used to augment feature encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
    HorizontalFlip,
    VerticalFlip,
    MainDiagonalFlip,
    AntiDiagonalFlip,
}

impl Rotation {
    pub const ALL: [Rotation; 8] = [
        Rotation::None,
        Rotation::Rotate90,
        Rotation::Rotate180,
        Rotation::Rotate270,
        Rotation::HorizontalFlip,
        Rotation::VerticalFlip,
        Rotation::MainDiagonalFlip,
        Rotation::AntiDiagonalFlip,
    ];

    /// Map a row-major square index on a `size × size` board
    pub fn rotate_position(self, position: usize, size: usize) -> usize {
        let (row, col) = (position / size, position % size);
        let last = size - 1;
        let (r, c) = match self {
            Rotation::None => (row, col),
            Rotation::Rotate90 => (col, last - row),
            Rotation::Rotate180 => (last - row, last - col),
            Rotation::Rotate270 => (last - col, row),
            Rotation::HorizontalFlip => (row, last - col),
            Rotation::VerticalFlip => (last - row, col),
            Rotation::MainDiagonalFlip => (col, row),
            Rotation::AntiDiagonalFlip => (last - col, last - row),
        };
        r * size + c
    }
}
