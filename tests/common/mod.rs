#![allow(dead_code)]
//! Synthetic module files for integration tests.

/// Divisions per pattern in the file layout
pub const DIVISIONS: usize = 64;

struct SampleSpec {
    name: String,
    pcm: Vec<i8>,
    volume: u8,
    finetune: u8,
    repeat_words: (u16, u16),
}

/// Build a MOD file byte by byte.
pub struct ModBuilder {
    name: String,
    tag: Option<[u8; 4]>,
    channels: usize,
    samples: Vec<SampleSpec>,
    cells: Vec<(usize, usize, usize, u32)>,
    order: Vec<u8>,
    extra_order: Vec<u8>,
    restart: u8,
}

/// Pack a pattern cell word.
pub fn cell_word(sample: u8, period: u16, effect: u16) -> u32 {
    let sample = sample as u32;
    ((sample & 0xF0) << 24)
        | (((period as u32) & 0x0FFF) << 16)
        | ((sample & 0x0F) << 12)
        | (effect as u32 & 0x0FFF)
}

impl ModBuilder {
    /// Tagged 31-sample layout
    pub fn tagged(tag: &[u8; 4], channels: usize) -> Self {
        Self {
            name: "synthetic".to_string(),
            tag: Some(*tag),
            channels,
            samples: Vec::new(),
            cells: Vec::new(),
            order: vec![0],
            extra_order: Vec::new(),
            restart: 0,
        }
    }

    /// Untagged 15-sample, 4-channel layout
    pub fn legacy() -> Self {
        Self {
            tag: None,
            ..Self::tagged(b"M.K.", 4)
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Append a sample; `repeat_words` is (offset, length) in words
    /// including the marker word, as stored in the file.
    pub fn sample(
        mut self,
        name: &str,
        pcm: &[i8],
        volume: u8,
        finetune: u8,
        repeat_words: (u16, u16),
    ) -> Self {
        self.samples.push(SampleSpec {
            name: name.to_string(),
            pcm: pcm.to_vec(),
            volume,
            finetune,
            repeat_words,
        });
        self
    }

    /// Place a cell; `sample` is 1-based as in the file, 0 = none.
    pub fn cell(
        mut self,
        pattern: usize,
        division: usize,
        channel: usize,
        sample: u8,
        period: u16,
        effect: u16,
    ) -> Self {
        self.cells
            .push((pattern, division, channel, cell_word(sample, period, effect)));
        self
    }

    /// Song positions (the first `order.len()` entries of the play order)
    pub fn order(mut self, order: &[u8]) -> Self {
        self.order = order.to_vec();
        self
    }

    /// Entries stored after the song length; they still count towards
    /// the number of patterns in the file.
    pub fn unused_order(mut self, entries: &[u8]) -> Self {
        self.extra_order = entries.to_vec();
        self
    }

    pub fn restart(mut self, position: u8) -> Self {
        self.restart = position;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let slots = if self.tag.is_some() { 31 } else { 15 };
        let mut data = text(&self.name, 20);

        for slot in 0..slots {
            match self.samples.get(slot) {
                Some(sample) => {
                    data.extend(text(&sample.name, 22));
                    let words = (sample.pcm.len() as u16 + 3) / 2;
                    data.extend(words.to_be_bytes());
                    data.push(sample.finetune);
                    data.push(sample.volume);
                    data.extend(sample.repeat_words.0.to_be_bytes());
                    data.extend(sample.repeat_words.1.to_be_bytes());
                }
                None => {
                    data.extend([0u8; 22]);
                    data.extend([0, 0, 0, 0, 0, 0, 0, 1]);
                }
            }
        }

        data.push(self.order.len() as u8);
        data.push(self.restart);
        let mut order = [0u8; 128];
        for (entry, &pattern) in order
            .iter_mut()
            .zip(self.order.iter().chain(&self.extra_order))
        {
            *entry = pattern;
        }
        data.extend(order);
        if let Some(tag) = &self.tag {
            data.extend(tag);
        }

        let pattern_count = order.iter().copied().max().unwrap_or(0) as usize + 1;
        let pattern_bytes = DIVISIONS * self.channels * 4;
        let mut patterns = vec![0u8; pattern_count * pattern_bytes];
        for &(pattern, division, channel, word) in &self.cells {
            let offset = pattern * pattern_bytes + (division * self.channels + channel) * 4;
            patterns[offset..offset + 4].copy_from_slice(&word.to_be_bytes());
        }
        data.extend(patterns);

        for sample in &self.samples {
            data.extend([0u8, 0]);
            data.extend(sample.pcm.iter().map(|&b| b as u8));
            if sample.pcm.len() % 2 == 1 {
                data.push(0);
            }
        }
        data
    }
}

fn text(value: &str, size: usize) -> Vec<u8> {
    let mut field = value.as_bytes().to_vec();
    field.resize(size, 0);
    field
}
